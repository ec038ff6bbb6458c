//! Page Session for pagemark.
//!
//! One `PageSession` owns everything about the page currently being
//! annotated: its document, highlight bookkeeping, navigation cursor and
//! the collaborators used to read preferences and persist highlights.
//! Independent sessions never share state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dom::{Document, NodeId};
use crate::managers::highlight_store::PersistenceAdapter;
use crate::managers::navigation_manager::{NavigationController, NavigationControllerTrait};
use crate::services::highlight_engine::{HighlightEngine, HighlightScope};
use crate::services::markdown_export::{self, ExportRequest, ExportedHighlight};
use crate::services::preferences_engine::PreferencesSource;
use crate::services::reader_mode::{ReaderMode, ReaderModeTrait};
use crate::types::highlight::{
    ClearOutcome, HighlightGroup, HighlightOutcome, HighlightState, NavigationInfo,
};
use crate::types::reader::ArticleContent;

/// URL of the page a fresh session starts on.
pub const BLANK_PAGE_URL: &str = "about:blank";

/// Loading progress of the page, mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Explicit per-page context for highlighting, navigation and extraction.
pub struct PageSession {
    url: String,
    title: String,
    document: Document,
    ready_state: ReadyState,
    state: HighlightState,
    navigator: NavigationController,
    engine: HighlightEngine,
    reader: ReaderMode,
    preferences: Arc<dyn PreferencesSource>,
    persistence: PersistenceAdapter,
    /// Saved terms are waiting for the document to become interactive.
    restore_pending: bool,
}

impl PageSession {
    /// Creates a session on an empty, fully loaded page.
    pub fn new(preferences: Arc<dyn PreferencesSource>, persistence: PersistenceAdapter) -> Self {
        Self {
            url: BLANK_PAGE_URL.to_string(),
            title: String::new(),
            document: Document::new(),
            ready_state: ReadyState::Complete,
            state: HighlightState::default(),
            navigator: NavigationController::new(),
            engine: HighlightEngine::new(),
            reader: ReaderMode::new(),
            preferences,
            persistence,
            restore_pending: false,
        }
    }

    /// Replaces the engine, e.g. to change batching.
    pub fn with_engine(mut self, engine: HighlightEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    pub fn navigator(&self) -> &NavigationController {
        &self.navigator
    }

    /// Subtree every highlight operation works on.
    fn root(&self) -> NodeId {
        self.document.body().unwrap_or_else(|| self.document.root())
    }

    fn split(&mut self) -> (HighlightScope<'_>, &HighlightEngine) {
        let root = self.root();
        (
            HighlightScope {
                doc: &mut self.document,
                root,
                state: &mut self.state,
                nav: &mut self.navigator,
            },
            &self.engine,
        )
    }

    /// Installs a new page. Title defaults to the document's `<title>`.
    ///
    /// Saved highlights for the URL are restored right away, or once
    /// [`PageSession::document_ready`] reports the page interactive.
    pub async fn load_page(
        &mut self,
        url: &str,
        title: Option<&str>,
        html: &str,
        ready_state: ReadyState,
    ) -> usize {
        self.document = Document::parse(html);
        self.url = url.to_string();
        self.title = title
            .map(str::to_string)
            .unwrap_or_else(|| self.document.title());
        self.ready_state = ready_state;
        self.state = HighlightState::default();
        self.navigator = NavigationController::new();
        self.restore_pending = false;
        debug!(url, ?ready_state, "page loaded");
        self.restore().await
    }

    /// Highlights `term`, persisting the result when anything matched.
    pub async fn highlight(&mut self, term: &str, clear_existing: bool) -> HighlightOutcome {
        let prefs = self.preferences.get_prefs();
        let report = {
            let (mut scope, engine) = self.split();
            engine
                .highlight_all(&mut scope, &prefs, term, clear_existing)
                .await
        };
        if report.cleared_page {
            self.persistence.erase(&self.url);
        }
        if report.outcome.count > 0 {
            self.persistence
                .save(&prefs, &self.url, &self.title, &self.state);
        }
        report.outcome
    }

    /// Removes every marker and erases the page's saved record.
    pub fn clear(&mut self) -> ClearOutcome {
        let outcome = {
            let (mut scope, _) = self.split();
            HighlightEngine::clear(&mut scope, None)
        };
        self.persistence.erase(&self.url);
        outcome
    }

    /// Removes one group's markers and re-saves the remaining terms.
    pub fn clear_group(&mut self, group_id: &str) -> ClearOutcome {
        let outcome = {
            let (mut scope, _) = self.split();
            HighlightEngine::clear(&mut scope, Some(group_id))
        };
        if outcome.found {
            let prefs = self.preferences.get_prefs();
            self.persistence
                .save(&prefs, &self.url, &self.title, &self.state);
        }
        outcome
    }

    pub fn nav_next(&mut self) -> bool {
        self.navigator.next(&mut self.document, &self.state.markers)
    }

    pub fn nav_previous(&mut self) -> bool {
        self.navigator.previous(&mut self.document, &self.state.markers)
    }

    pub fn nav_first(&mut self) -> bool {
        self.navigator.first(&mut self.document, &self.state.markers)
    }

    pub fn nav_last(&mut self) -> bool {
        self.navigator.last(&mut self.document, &self.state.markers)
    }

    pub fn nav_info(&self) -> NavigationInfo {
        self.navigator.info(self.state.markers.len())
    }

    /// Active groups in first-use order.
    pub fn active_groups(&self) -> Vec<HighlightGroup> {
        self.state.groups.clone()
    }

    /// Readable content of the current document.
    pub fn extract_content(&self) -> ArticleContent {
        self.reader.extract_content(&self.document, &self.url)
    }

    /// The live document, markers included, as HTML.
    pub fn page_html(&self) -> String {
        self.document.to_html()
    }

    /// Markdown export of the highlights and the page's readable content.
    pub fn export_markdown(&self, exported_at: DateTime<Utc>) -> String {
        let prefs = self.preferences.get_prefs();
        let highlights: Vec<ExportedHighlight> = self
            .state
            .markers
            .iter()
            .map(|marker| ExportedHighlight {
                group: marker.group.clone(),
                text: self.document.text_content(marker.node).trim().to_string(),
            })
            .collect();
        let content = self.extract_content();
        markdown_export::export_document(&ExportRequest {
            title: &self.title,
            url: &self.url,
            exported_at,
            highlights: &highlights,
            groups: &self.state.groups,
            multi_color: prefs.multi_color_mode,
            content_html: &content.html,
        })
    }

    /// Seeds groups and saved terms from the page's record and re-applies
    /// them once the document is interactive. Returns the number of markers
    /// on the page afterwards (0 while the restore is deferred).
    pub async fn restore(&mut self) -> usize {
        let prefs = self.preferences.get_prefs();
        let Some(record) = self.persistence.load(&prefs, &self.url) else {
            return 0;
        };

        for term in &record.terms {
            if let Some(color) = record.color_assignments.get(term) {
                self.seed_group(term, color);
            }
        }
        for (term, color) in &record.color_assignments {
            self.seed_group(term, color);
        }
        self.state.saved_terms.clear();
        for term in &record.terms {
            self.state.remember_term(term);
        }
        info!(url = %self.url, terms = record.terms.len(), "restoring highlights for page");

        if self.ready_state == ReadyState::Loading {
            self.restore_pending = true;
            return 0;
        }
        self.apply_saved_terms().await
    }

    /// Records a ready-state change, running a deferred restore when the
    /// page stops loading.
    pub async fn document_ready(&mut self, ready_state: ReadyState) -> usize {
        self.ready_state = ready_state;
        if ready_state != ReadyState::Loading && self.restore_pending {
            self.restore_pending = false;
            return self.apply_saved_terms().await;
        }
        self.state.markers.len()
    }

    fn seed_group(&mut self, term: &str, color: &str) {
        if self.state.group(term).is_none() {
            self.state.groups.push(HighlightGroup {
                term: term.to_string(),
                color: color.to_string(),
                count: 0,
            });
        }
    }

    /// Re-runs every saved term additively, then selects the first marker.
    async fn apply_saved_terms(&mut self) -> usize {
        let terms = self.state.saved_terms.clone();
        for term in terms.iter().filter(|t| !t.trim().is_empty()) {
            self.highlight(term, false).await;
        }
        if !self.state.markers.is_empty() {
            self.navigator
                .goto_index(&mut self.document, &self.state.markers, 0, true);
        }
        self.state.markers.len()
    }
}
