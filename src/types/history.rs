use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lightweight index entry for a page that has saved highlights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Milliseconds since the UNIX epoch.
    pub last_updated: i64,
    pub highlight_count: usize,
}

/// Highlight state persisted for one page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPageRecord {
    pub url: String,
    pub title: String,
    pub terms: Vec<String>,
    pub color_assignments: BTreeMap<String, String>,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
}
