//! Highlight Scheduler for pagemark.
//!
//! Coalesces highlight requests and guarantees that at most one highlight
//! pass runs at a time. A single worker task moves through
//! `Idle -> Debouncing -> Running -> Idle`:
//!
//! - **Idle**: waiting for a request.
//! - **Debouncing**: every new request restarts the quiet-period timer.
//! - **Running**: queued requests run in FIFO order under the session lock;
//!   requests that arrive meanwhile join the back of the queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::managers::page_session::PageSession;
use crate::types::errors::SchedulerError;
use crate::types::highlight::HighlightOutcome;

/// Phase of the scheduler worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Debouncing,
    Running,
}

struct HighlightRequest {
    term: String,
    clear_existing: bool,
    respond: oneshot::Sender<HighlightOutcome>,
}

/// Handle to the worker task. Dropping it lets the worker finish the
/// requests it already holds and exit.
pub struct HighlightScheduler {
    requests: mpsc::UnboundedSender<HighlightRequest>,
    state: watch::Receiver<SchedulerState>,
    worker: JoinHandle<()>,
}

impl HighlightScheduler {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(session: Arc<Mutex<PageSession>>, debounce: Duration) -> Self {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SchedulerState::Idle);
        let worker = tokio::spawn(run_worker(receiver, session, debounce, state_tx));
        Self {
            requests,
            state,
            worker,
        }
    }

    /// Queues a request and returns a receiver for its outcome.
    pub fn submit(
        &self,
        term: &str,
        clear_existing: bool,
    ) -> Result<oneshot::Receiver<HighlightOutcome>, SchedulerError> {
        let (respond, outcome) = oneshot::channel();
        self.requests
            .send(HighlightRequest {
                term: term.to_string(),
                clear_existing,
                respond,
            })
            .map_err(|_| SchedulerError::Closed)?;
        Ok(outcome)
    }

    /// Queues a request and waits for its pass to finish.
    pub async fn request(
        &self,
        term: &str,
        clear_existing: bool,
    ) -> Result<HighlightOutcome, SchedulerError> {
        let outcome = self.submit(term, clear_existing)?;
        outcome
            .await
            .map_err(|_| SchedulerError::Dropped(term.to_string()))
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.requests.is_closed() || self.worker.is_finished()
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<HighlightRequest>,
    session: Arc<Mutex<PageSession>>,
    debounce: Duration,
    state: watch::Sender<SchedulerState>,
) {
    let mut queue: VecDeque<HighlightRequest> = VecDeque::new();

    while let Some(first) = receiver.recv().await {
        queue.push_back(first);
        state.send_replace(SchedulerState::Debouncing);

        let mut closed = false;
        loop {
            match tokio::time::timeout(debounce, receiver.recv()).await {
                Ok(Some(request)) => queue.push_back(request),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        state.send_replace(SchedulerState::Running);
        debug!(queued = queue.len(), "running highlight queue");
        {
            let mut page = session.lock().await;
            while let Some(request) = queue.pop_front() {
                let outcome = page
                    .highlight(&request.term, request.clear_existing)
                    .await;
                // the requester may have stopped waiting
                let _ = request.respond.send(outcome);
                while let Ok(late) = receiver.try_recv() {
                    queue.push_back(late);
                }
            }
        }
        state.send_replace(SchedulerState::Idle);

        if closed {
            break;
        }
    }
}
