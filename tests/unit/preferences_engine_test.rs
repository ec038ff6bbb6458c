use std::sync::RwLock;

use pagemark::services::preferences_engine::{
    PreferencesEngine, PreferencesEngineTrait, PreferencesSource,
};
use pagemark::types::errors::PreferencesError;
use pagemark::types::preferences::HighlightPreferences;
use rstest::rstest;
use serde_json::json;

fn temp_config_path() -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preferences.json").to_string_lossy().to_string();
    // Leak the tempdir so it doesn't get cleaned up during the test
    std::mem::forget(dir);
    path
}

#[test]
fn test_load_missing_file_returns_defaults() {
    let mut engine = PreferencesEngine::new(Some(temp_config_path()));
    let prefs = engine.load().unwrap();
    assert_eq!(prefs, HighlightPreferences::default());
    assert!(prefs.persist_highlights);
    assert_eq!(prefs.debounce_ms, 150);
}

#[test]
fn test_load_malformed_file_is_an_error() {
    let path = temp_config_path();
    std::fs::write(&path, "{ not json").unwrap();
    let mut engine = PreferencesEngine::new(Some(path));
    assert!(matches!(
        engine.load(),
        Err(PreferencesError::SerializationError(_))
    ));
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let path = temp_config_path();
    std::fs::write(&path, r#"{"case_sensitive": true, "palette": ["rgb(1,2,3)"]}"#).unwrap();
    let mut engine = PreferencesEngine::new(Some(path));
    let prefs = engine.load().unwrap();

    assert!(prefs.case_sensitive);
    assert_eq!(prefs.palette, vec!["rgb(1,2,3)".to_string()]);
    assert_eq!(prefs.long_text_threshold, 100);
    assert_eq!(prefs.transparency, Some(60));
}

#[test]
fn test_set_value_saves_and_reloads() {
    let path = temp_config_path();
    let mut engine = PreferencesEngine::new(Some(path.clone()));
    engine.load().unwrap();
    engine.set_value("multi_color_mode", json!(true)).unwrap();
    engine.set_value("exclude_selectors", json!("nav\nfooter")).unwrap();

    let mut reloaded = PreferencesEngine::new(Some(path));
    let prefs = reloaded.load().unwrap();
    assert!(prefs.multi_color_mode);
    assert_eq!(
        prefs.exclude_selector_list(),
        vec!["nav".to_string(), "footer".to_string()]
    );
}

#[test]
fn test_set_value_clears_optional_transparency() {
    let mut engine = PreferencesEngine::new(Some(temp_config_path()));
    engine.load().unwrap();
    engine.set_value("transparency", json!(null)).unwrap();
    assert_eq!(engine.get_preferences().transparency, None);
}

#[rstest]
#[case("")]
#[case("no_such_field")]
#[case("color.inner")]
fn test_set_value_rejects_bad_keys(#[case] key: &str) {
    let mut engine = PreferencesEngine::new(Some(temp_config_path()));
    engine.load().unwrap();
    assert!(matches!(
        engine.set_value(key, json!(true)),
        Err(PreferencesError::InvalidKey(_))
    ));
}

#[rstest]
#[case("case_sensitive", json!("yes"))]
#[case("debounce_ms", json!(-5))]
#[case("transparency", json!(300))]
#[case("palette", json!("rgb(1,2,3)"))]
fn test_set_value_rejects_wrong_types(#[case] key: &str, #[case] value: serde_json::Value) {
    let mut engine = PreferencesEngine::new(Some(temp_config_path()));
    engine.load().unwrap();
    let before = engine.get_preferences().clone();

    assert!(matches!(
        engine.set_value(key, value),
        Err(PreferencesError::InvalidValue(_))
    ));
    assert_eq!(engine.get_preferences(), &before);
}

#[test]
fn test_reset_restores_defaults_on_disk() {
    let path = temp_config_path();
    let mut engine = PreferencesEngine::new(Some(path.clone()));
    engine.load().unwrap();
    engine.set_value("whole_word", json!(true)).unwrap();
    engine.reset().unwrap();

    let mut reloaded = PreferencesEngine::new(Some(path));
    assert_eq!(reloaded.load().unwrap(), HighlightPreferences::default());
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/preferences.json");
    let engine = PreferencesEngine::new(Some(path.to_string_lossy().to_string()));
    engine.save().unwrap();
    assert!(path.exists());
}

#[test]
fn test_locked_engine_serves_resolved_snapshots() {
    let mut engine = PreferencesEngine::new(Some(temp_config_path()));
    engine.load().unwrap();
    engine.set_value("color", json!("rgb(200, 100, 0)")).unwrap();
    engine.set_value("transparency", json!(40)).unwrap();

    let source = RwLock::new(engine);
    let prefs = source.get_prefs();
    assert_eq!(prefs.color, "rgba(200, 100, 0, 0.4)");

    // the stored value keeps the original notation
    assert_eq!(
        source.read().unwrap().get_preferences().color,
        "rgb(200, 100, 0)"
    );
}
