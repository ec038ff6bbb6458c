//! Highlight persistence for pagemark.
//!
//! `HighlightStore` is the key-value seam: one record per page plus a
//! bounded, recency-ordered history index. `SqliteHighlightStore` keeps both
//! in SQLite via `rusqlite`; `MemoryHighlightStore` keeps them in process.
//! `PersistenceAdapter` sits on top and turns every store failure into a
//! logged no-op so highlight operations never fail because of storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::types::errors::StoreError;
use crate::types::highlight::HighlightState;
use crate::types::history::{HistoryEntry, PersistedPageRecord};
use crate::types::preferences::HighlightPreferences;

/// Prefix of every per-page record key.
pub const PAGE_KEY_PREFIX: &str = "kh_highlights_";

/// Trait defining highlight persistence operations.
pub trait HighlightStore: Send + Sync {
    fn load_page(&self, page_key: &str) -> Result<Option<PersistedPageRecord>, StoreError>;
    fn save_page(&self, page_key: &str, record: &PersistedPageRecord) -> Result<(), StoreError>;
    fn remove_page(&self, page_key: &str) -> Result<(), StoreError>;
    /// Inserts or refreshes the entry for `entry.url`, then evicts the
    /// least recently updated entries beyond `cap`.
    fn upsert_history(&self, entry: &HistoryEntry, cap: usize) -> Result<(), StoreError>;
    /// All entries, most recently updated first.
    fn list_history(&self) -> Result<Vec<HistoryEntry>, StoreError>;
    fn delete_history(&self, url: &str) -> Result<bool, StoreError>;
}

// ─── SQLite ───

/// Highlight store backed by a SQLite database.
pub struct SqliteHighlightStore {
    db: Mutex<Database>,
}

impl SqliteHighlightStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db
            .lock()
            .map_err(|_| StoreError::HostUnavailable("database lock poisoned".to_string()))
    }

    /// Reads a single `HistoryEntry` row into a struct.
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        Ok(HistoryEntry {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            last_updated: row.get(3)?,
            highlight_count: row.get::<_, i64>(4)?.max(0) as usize,
        })
    }
}

impl HighlightStore for SqliteHighlightStore {
    fn load_page(&self, page_key: &str) -> Result<Option<PersistedPageRecord>, StoreError> {
        let db = self.db()?;
        let row: Option<(String, String, String, String, i64)> = db
            .connection()
            .query_row(
                "SELECT url, title, terms, color_assignments, timestamp
                 FROM page_highlights WHERE page_key = ?1",
                params![page_key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        match row {
            Some((url, title, terms, colors, timestamp)) => Ok(Some(PersistedPageRecord {
                url,
                title,
                terms: serde_json::from_str(&terms)?,
                color_assignments: serde_json::from_str(&colors)?,
                timestamp,
            })),
            None => Ok(None),
        }
    }

    fn save_page(&self, page_key: &str, record: &PersistedPageRecord) -> Result<(), StoreError> {
        let terms = serde_json::to_string(&record.terms)?;
        let colors = serde_json::to_string(&record.color_assignments)?;
        let db = self.db()?;
        db.connection().execute(
            "INSERT INTO page_highlights (page_key, url, title, terms, color_assignments, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(page_key) DO UPDATE SET
                 url = excluded.url,
                 title = excluded.title,
                 terms = excluded.terms,
                 color_assignments = excluded.color_assignments,
                 timestamp = excluded.timestamp",
            params![page_key, record.url, record.title, terms, colors, record.timestamp],
        )?;
        Ok(())
    }

    fn remove_page(&self, page_key: &str) -> Result<(), StoreError> {
        let db = self.db()?;
        db.connection().execute(
            "DELETE FROM page_highlights WHERE page_key = ?1",
            params![page_key],
        )?;
        Ok(())
    }

    fn upsert_history(&self, entry: &HistoryEntry, cap: usize) -> Result<(), StoreError> {
        let db = self.db()?;
        let conn = db.connection();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM highlight_history WHERE url = ?1",
                params![entry.url],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE highlight_history
                     SET title = ?1, last_updated = ?2, highlight_count = ?3 WHERE id = ?4",
                    params![entry.title, entry.last_updated, entry.highlight_count as i64, id],
                )?;
            }
            None => {
                conn.execute(
                    "INSERT INTO highlight_history (id, url, title, last_updated, highlight_count)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        entry.id,
                        entry.url,
                        entry.title,
                        entry.last_updated,
                        entry.highlight_count as i64
                    ],
                )?;
            }
        }

        conn.execute(
            "DELETE FROM highlight_history WHERE id NOT IN (
                 SELECT id FROM highlight_history
                 ORDER BY last_updated DESC, rowid DESC LIMIT ?1
             )",
            params![cap as i64],
        )?;
        Ok(())
    }

    fn list_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let db = self.db()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, url, title, last_updated, highlight_count FROM highlight_history
             ORDER BY last_updated DESC, rowid DESC",
        )?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn delete_history(&self, url: &str) -> Result<bool, StoreError> {
        let db = self.db()?;
        let affected = db
            .connection()
            .execute("DELETE FROM highlight_history WHERE url = ?1", params![url])?;
        Ok(affected > 0)
    }
}

// ─── In-memory ───

/// In-process store. `set_available(false)` makes every call fail with
/// `HostUnavailable`, as if the host had been torn down.
pub struct MemoryHighlightStore {
    pages: Mutex<HashMap<String, PersistedPageRecord>>,
    /// Oldest insertion first.
    history: Mutex<Vec<HistoryEntry>>,
    available: AtomicBool,
}

impl MemoryHighlightStore {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::HostUnavailable("store disconnected".to_string()))
        }
    }

    fn pages(&self) -> Result<MutexGuard<'_, HashMap<String, PersistedPageRecord>>, StoreError> {
        self.check()?;
        self.pages
            .lock()
            .map_err(|_| StoreError::HostUnavailable("page lock poisoned".to_string()))
    }

    fn history(&self) -> Result<MutexGuard<'_, Vec<HistoryEntry>>, StoreError> {
        self.check()?;
        self.history
            .lock()
            .map_err(|_| StoreError::HostUnavailable("history lock poisoned".to_string()))
    }

    /// Most recent first; ties go to the later insertion.
    fn by_recency(entries: &[HistoryEntry]) -> Vec<HistoryEntry> {
        let mut sorted: Vec<HistoryEntry> = entries.iter().rev().cloned().collect();
        sorted.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        sorted
    }
}

impl Default for MemoryHighlightStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightStore for MemoryHighlightStore {
    fn load_page(&self, page_key: &str) -> Result<Option<PersistedPageRecord>, StoreError> {
        Ok(self.pages()?.get(page_key).cloned())
    }

    fn save_page(&self, page_key: &str, record: &PersistedPageRecord) -> Result<(), StoreError> {
        self.pages()?.insert(page_key.to_string(), record.clone());
        Ok(())
    }

    fn remove_page(&self, page_key: &str) -> Result<(), StoreError> {
        self.pages()?.remove(page_key);
        Ok(())
    }

    fn upsert_history(&self, entry: &HistoryEntry, cap: usize) -> Result<(), StoreError> {
        let mut history = self.history()?;
        let id = history
            .iter()
            .find(|e| e.url == entry.url)
            .map(|e| e.id.clone())
            .unwrap_or_else(|| entry.id.clone());
        history.retain(|e| e.url != entry.url);
        history.push(HistoryEntry {
            id,
            ..entry.clone()
        });

        if history.len() > cap {
            let mut kept = Self::by_recency(&history);
            kept.truncate(cap);
            kept.reverse();
            *history = kept;
        }
        Ok(())
    }

    fn list_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(Self::by_recency(&self.history()?))
    }

    fn delete_history(&self, url: &str) -> Result<bool, StoreError> {
        let mut history = self.history()?;
        let before = history.len();
        history.retain(|e| e.url != url);
        Ok(history.len() != before)
    }
}

// ─── Adapter ───

/// Saves and restores a page's highlight terms. Never fails: store errors
/// are logged and the operation resolves to its empty result.
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn HighlightStore>,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }

    /// Storage key for a page's record.
    pub fn page_key(url: &str) -> String {
        format!("{}{}", PAGE_KEY_PREFIX, url)
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Logs a store failure at a level matching its kind and drops it.
    fn soften<T>(result: Result<T, StoreError>, operation: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) if err.is_host_unavailable() => {
                debug!(operation, error = %err, "highlight store unavailable");
                None
            }
            Err(err) => {
                warn!(operation, error = %err, "highlight store operation failed");
                None
            }
        }
    }

    /// Writes the page's terms and colors, then refreshes its history entry.
    ///
    /// Uses the active groups, or the saved terms when no group is active.
    /// Returns `true` if the record was written.
    pub fn save(
        &self,
        prefs: &HighlightPreferences,
        url: &str,
        title: &str,
        state: &HighlightState,
    ) -> bool {
        if !prefs.persist_highlights {
            return false;
        }

        let mut record = PersistedPageRecord {
            url: url.to_string(),
            title: title.to_string(),
            terms: Vec::new(),
            color_assignments: Default::default(),
            timestamp: Self::now_millis(),
        };
        for group in &state.groups {
            record.terms.push(group.term.clone());
            record
                .color_assignments
                .insert(group.term.clone(), group.color.clone());
        }
        if record.terms.is_empty() {
            record.terms = state.saved_terms.clone();
        }

        if Self::soften(self.store.save_page(&Self::page_key(url), &record), "save_page").is_none()
        {
            return false;
        }

        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: title.to_string(),
            last_updated: record.timestamp,
            highlight_count: record.terms.len(),
        };
        Self::soften(
            self.store.upsert_history(&entry, prefs.history_limit),
            "upsert_history",
        );
        info!(url, terms = record.terms.len(), "saved highlights for page");
        true
    }

    /// The saved record for `url`, if persistence is on and it has terms.
    pub fn load(&self, prefs: &HighlightPreferences, url: &str) -> Option<PersistedPageRecord> {
        if !prefs.persist_highlights {
            return None;
        }
        Self::soften(self.store.load_page(&Self::page_key(url)), "load_page")
            .flatten()
            .filter(|record| !record.terms.is_empty())
    }

    /// Deletes the saved record for `url`.
    pub fn erase(&self, url: &str) {
        Self::soften(self.store.remove_page(&Self::page_key(url)), "remove_page");
    }

    /// History index, most recent first; empty when the store is unavailable.
    pub fn history(&self) -> Vec<HistoryEntry> {
        Self::soften(self.store.list_history(), "list_history").unwrap_or_default()
    }

    /// Removes both the record and the history entry for `url`.
    pub fn forget(&self, url: &str) -> bool {
        self.erase(url);
        Self::soften(self.store.delete_history(url), "delete_history").unwrap_or(false)
    }
}
