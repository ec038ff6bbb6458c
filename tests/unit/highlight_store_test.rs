//! Unit tests for the highlight stores and the soft-failing persistence adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use pagemark::database::Database;
use pagemark::managers::highlight_store::{
    HighlightStore, MemoryHighlightStore, PersistenceAdapter, SqliteHighlightStore,
    PAGE_KEY_PREFIX,
};
use pagemark::types::highlight::{HighlightGroup, HighlightState};
use pagemark::types::history::{HistoryEntry, PersistedPageRecord};
use pagemark::types::preferences::HighlightPreferences;
use rstest::rstest;
use tempfile::TempDir;

fn sqlite_store() -> Arc<dyn HighlightStore> {
    Arc::new(SqliteHighlightStore::new(
        Database::open_in_memory().expect("open_in_memory failed"),
    ))
}

fn memory_store() -> Arc<dyn HighlightStore> {
    Arc::new(MemoryHighlightStore::new())
}

fn record(url: &str, terms: &[&str]) -> PersistedPageRecord {
    PersistedPageRecord {
        url: url.to_string(),
        title: "Title".to_string(),
        terms: terms.iter().map(|t| t.to_string()).collect(),
        color_assignments: BTreeMap::new(),
        timestamp: 1_700_000_000_000,
    }
}

fn entry(url: &str, last_updated: i64) -> HistoryEntry {
    HistoryEntry {
        id: format!("id-{}", url),
        url: url.to_string(),
        title: url.to_uppercase(),
        last_updated,
        highlight_count: 1,
    }
}

fn state_with_terms(terms: &[&str]) -> HighlightState {
    let mut state = HighlightState::default();
    for term in terms {
        state.remember_term(term);
    }
    state
}

// ─── Store contract (both implementations) ───

#[rstest]
#[case::sqlite(sqlite_store())]
#[case::memory(memory_store())]
fn test_page_record_round_trip(#[case] store: Arc<dyn HighlightStore>) {
    let mut saved = record("https://example.com", &["fox", "dog"]);
    saved
        .color_assignments
        .insert("fox".to_string(), "rgba(1, 2, 3, 0.6)".to_string());

    store.save_page("k", &saved).unwrap();
    assert_eq!(store.load_page("k").unwrap(), Some(saved));
    assert_eq!(store.load_page("missing").unwrap(), None);

    store.remove_page("k").unwrap();
    assert_eq!(store.load_page("k").unwrap(), None);
}

#[rstest]
#[case::sqlite(sqlite_store())]
#[case::memory(memory_store())]
fn test_save_page_overwrites(#[case] store: Arc<dyn HighlightStore>) {
    store.save_page("k", &record("u", &["fox"])).unwrap();
    store.save_page("k", &record("u", &["dog"])).unwrap();
    let loaded = store.load_page("k").unwrap().unwrap();
    assert_eq!(loaded.terms, vec!["dog".to_string()]);
}

#[rstest]
#[case::sqlite(sqlite_store())]
#[case::memory(memory_store())]
fn test_history_is_most_recent_first(#[case] store: Arc<dyn HighlightStore>) {
    store.upsert_history(&entry("a", 10), 100).unwrap();
    store.upsert_history(&entry("b", 30), 100).unwrap();
    store.upsert_history(&entry("c", 20), 100).unwrap();

    let urls: Vec<String> = store.list_history().unwrap().into_iter().map(|e| e.url).collect();
    assert_eq!(urls, vec!["b", "c", "a"]);
}

#[rstest]
#[case::sqlite(sqlite_store())]
#[case::memory(memory_store())]
fn test_history_upsert_keeps_one_entry_per_url(#[case] store: Arc<dyn HighlightStore>) {
    store.upsert_history(&entry("a", 10), 100).unwrap();
    let mut refreshed = entry("a", 50);
    refreshed.id = "different-id".to_string();
    refreshed.highlight_count = 7;
    store.upsert_history(&refreshed, 100).unwrap();

    let history = store.list_history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "id-a", "existing id is kept");
    assert_eq!(history[0].last_updated, 50);
    assert_eq!(history[0].highlight_count, 7);
}

#[rstest]
#[case::sqlite(sqlite_store())]
#[case::memory(memory_store())]
fn test_history_evicts_oldest_beyond_cap(#[case] store: Arc<dyn HighlightStore>) {
    for (i, url) in ["a", "b", "c", "d"].iter().enumerate() {
        store.upsert_history(&entry(url, i as i64), 3).unwrap();
    }
    let urls: Vec<String> = store.list_history().unwrap().into_iter().map(|e| e.url).collect();
    assert_eq!(urls, vec!["d", "c", "b"]);
}

#[rstest]
#[case::sqlite(sqlite_store())]
#[case::memory(memory_store())]
fn test_delete_history(#[case] store: Arc<dyn HighlightStore>) {
    store.upsert_history(&entry("a", 1), 10).unwrap();
    assert!(store.delete_history("a").unwrap());
    assert!(!store.delete_history("a").unwrap());
    assert!(store.list_history().unwrap().is_empty());
}

#[test]
fn test_sqlite_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pagemark.db");
    {
        let store = SqliteHighlightStore::new(Database::open(&path).unwrap());
        store.save_page("k", &record("u", &["fox"])).unwrap();
    }
    let store = SqliteHighlightStore::new(Database::open(&path).unwrap());
    assert!(store.load_page("k").unwrap().is_some());
}

#[test]
fn test_memory_store_reports_host_unavailable() {
    let store = MemoryHighlightStore::new();
    store.set_available(false);
    let err = store.load_page("k").unwrap_err();
    assert!(err.is_host_unavailable());
    store.set_available(true);
    assert!(store.load_page("k").is_ok());
}

// ─── Adapter ───

#[test]
fn test_page_key_uses_prefix() {
    assert_eq!(
        PersistenceAdapter::page_key("https://example.com/a"),
        format!("{}https://example.com/a", PAGE_KEY_PREFIX)
    );
}

#[test]
fn test_adapter_saves_saved_terms_in_single_color_mode() {
    let store = memory_store();
    let adapter = PersistenceAdapter::new(store.clone());
    let prefs = HighlightPreferences::default();

    assert!(adapter.save(&prefs, "u", "Page", &state_with_terms(&["fox", "dog"])));

    let loaded = adapter.load(&prefs, "u").expect("record");
    assert_eq!(loaded.terms, vec!["fox".to_string(), "dog".to_string()]);
    assert!(loaded.color_assignments.is_empty());

    let history = adapter.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].title, "Page");
    assert_eq!(history[0].highlight_count, 2);
}

#[test]
fn test_adapter_saves_groups_with_colors_in_first_use_order() {
    let adapter = PersistenceAdapter::new(memory_store());
    let prefs = HighlightPreferences::default();
    let mut state = HighlightState::default();
    for (term, color) in [("zeta", "c1"), ("alpha", "c2")] {
        state.groups.push(HighlightGroup {
            term: term.to_string(),
            color: color.to_string(),
            count: 1,
        });
    }

    adapter.save(&prefs, "u", "Page", &state);
    let loaded = adapter.load(&prefs, "u").unwrap();
    assert_eq!(loaded.terms, vec!["zeta".to_string(), "alpha".to_string()]);
    assert_eq!(loaded.color_assignments.get("alpha").map(String::as_str), Some("c2"));
}

#[test]
fn test_adapter_respects_persistence_switch() {
    let store = memory_store();
    let adapter = PersistenceAdapter::new(store.clone());
    let off = HighlightPreferences {
        persist_highlights: false,
        ..HighlightPreferences::default()
    };
    assert!(!adapter.save(&off, "u", "Page", &state_with_terms(&["fox"])));
    assert!(store.load_page(&PersistenceAdapter::page_key("u")).unwrap().is_none());

    adapter.save(&HighlightPreferences::default(), "u", "Page", &state_with_terms(&["fox"]));
    assert!(adapter.load(&off, "u").is_none());
}

#[test]
fn test_adapter_ignores_records_without_terms() {
    let store = memory_store();
    store
        .save_page(&PersistenceAdapter::page_key("u"), &record("u", &[]))
        .unwrap();
    let adapter = PersistenceAdapter::new(store);
    assert!(adapter.load(&HighlightPreferences::default(), "u").is_none());
}

#[test]
fn test_adapter_is_soft_when_host_unavailable() {
    let store = Arc::new(MemoryHighlightStore::new());
    let adapter = PersistenceAdapter::new(store.clone());
    let prefs = HighlightPreferences::default();
    adapter.save(&prefs, "u", "Page", &state_with_terms(&["fox"]));

    store.set_available(false);
    assert!(!adapter.save(&prefs, "u", "Page", &state_with_terms(&["dog"])));
    assert!(adapter.load(&prefs, "u").is_none());
    assert!(adapter.history().is_empty());
    assert!(!adapter.forget("u"));
    adapter.erase("u");

    store.set_available(true);
    let loaded = adapter.load(&prefs, "u").expect("record survives outage");
    assert_eq!(loaded.terms, vec!["fox".to_string()]);
}

#[test]
fn test_adapter_erase_and_forget() {
    let adapter = PersistenceAdapter::new(memory_store());
    let prefs = HighlightPreferences::default();
    adapter.save(&prefs, "u", "Page", &state_with_terms(&["fox"]));

    adapter.erase("u");
    assert!(adapter.load(&prefs, "u").is_none());
    assert_eq!(adapter.history().len(), 1, "erase keeps the history entry");

    assert!(adapter.forget("u"));
    assert!(adapter.history().is_empty());
}

#[test]
fn test_adapter_history_cap_comes_from_preferences() {
    let adapter = PersistenceAdapter::new(sqlite_store());
    let prefs = HighlightPreferences {
        history_limit: 2,
        ..HighlightPreferences::default()
    };
    for url in ["a", "b", "c"] {
        adapter.save(&prefs, url, "Page", &state_with_terms(&["fox"]));
    }
    let urls: Vec<String> = adapter.history().into_iter().map(|e| e.url).collect();
    assert_eq!(urls, vec!["c", "b"]);
}
