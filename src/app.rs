//! App Core for pagemark.
//!
//! Wires the highlight store, preferences, the page session and its
//! scheduler together. Must be created inside a tokio runtime because the
//! scheduler spawns its worker task.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::database::connection::Database;
use crate::managers::highlight_scheduler::HighlightScheduler;
use crate::managers::highlight_store::{
    HighlightStore, MemoryHighlightStore, PersistenceAdapter, SqliteHighlightStore,
};
use crate::managers::page_session::PageSession;
use crate::services::preferences_engine::{PreferencesEngine, PreferencesEngineTrait};

/// Central application struct.
pub struct App {
    pub store: Arc<dyn HighlightStore>,
    pub preferences: Arc<RwLock<PreferencesEngine>>,
    pub session: Arc<Mutex<PageSession>>,
    pub scheduler: HighlightScheduler,
}

impl App {
    /// Opens (or creates) the SQLite database at `db_path`.
    ///
    /// `prefs_path` overrides the preferences file location.
    pub fn new(db_path: &str, prefs_path: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open(db_path)?;
        info!(db_path, "highlight database opened");
        Ok(Self::with_store(Arc::new(SqliteHighlightStore::new(db)), prefs_path))
    }

    /// Keeps highlights in memory only.
    pub fn in_memory(prefs_path: Option<String>) -> Self {
        Self::with_store(Arc::new(MemoryHighlightStore::new()), prefs_path)
    }

    /// Builds the app around any store implementation.
    pub fn with_store(store: Arc<dyn HighlightStore>, prefs_path: Option<String>) -> Self {
        let mut engine = PreferencesEngine::new(prefs_path);
        if let Err(e) = engine.load() {
            warn!(error = %e, path = engine.get_config_path(), "preferences unreadable, using defaults");
        }
        let debounce = Duration::from_millis(engine.get_preferences().debounce_ms);
        let preferences = Arc::new(RwLock::new(engine));

        let session = PageSession::new(
            preferences.clone(),
            PersistenceAdapter::new(store.clone()),
        );
        let session = Arc::new(Mutex::new(session));
        let scheduler = HighlightScheduler::spawn(session.clone(), debounce);

        Self {
            store,
            preferences,
            session,
            scheduler,
        }
    }
}
