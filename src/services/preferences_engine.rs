// pagemark Preferences Engine
// Loads, saves and updates highlight preferences stored as a JSON file at the
// platform config path, and hands resolved snapshots to highlight passes.

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use tracing::warn;

use crate::platform;
use crate::types::errors::PreferencesError;
use crate::types::preferences::HighlightPreferences;

/// Trait defining the preferences engine interface.
pub trait PreferencesEngineTrait {
    fn load(&mut self) -> Result<HighlightPreferences, PreferencesError>;
    fn save(&self) -> Result<(), PreferencesError>;
    fn get_preferences(&self) -> &HighlightPreferences;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), PreferencesError>;
    fn reset(&mut self) -> Result<(), PreferencesError>;
    fn get_config_path(&self) -> &str;
}

/// Read side used by highlight passes. Implementations never fail: when the
/// underlying source is unavailable they answer with the defaults.
pub trait PreferencesSource: Send + Sync {
    /// A snapshot with transparency already applied to the single color.
    fn get_prefs(&self) -> HighlightPreferences;
}

/// Preferences engine that persists preferences as JSON on disk.
pub struct PreferencesEngine {
    config_path: String,
    preferences: HighlightPreferences,
}

impl PreferencesEngine {
    /// Creates a new PreferencesEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the preferences file.
    /// Otherwise, uses `preferences.json` in the platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("preferences.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            preferences: HighlightPreferences::default(),
        }
    }
}

impl PreferencesEngineTrait for PreferencesEngine {
    /// Loads preferences from the JSON file.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    /// Fields absent from the file take their default values.
    fn load(&mut self) -> Result<HighlightPreferences, PreferencesError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.preferences = HighlightPreferences::default();
            return Ok(self.preferences.clone());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PreferencesError::IoError(format!("Failed to read preferences file: {}", e))
        })?;

        let preferences: HighlightPreferences = serde_json::from_str(&content).map_err(|e| {
            PreferencesError::SerializationError(format!(
                "Failed to parse preferences file: {}",
                e
            ))
        })?;

        self.preferences = preferences;
        Ok(self.preferences.clone())
    }

    /// Writes the current preferences, creating parent directories as needed.
    fn save(&self) -> Result<(), PreferencesError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PreferencesError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.preferences).map_err(|e| {
            PreferencesError::SerializationError(format!("Failed to serialize preferences: {}", e))
        })?;

        fs::write(path, json).map_err(|e| {
            PreferencesError::IoError(format!("Failed to write preferences file: {}", e))
        })?;

        Ok(())
    }

    fn get_preferences(&self) -> &HighlightPreferences {
        &self.preferences
    }

    /// Updates one preference by (dot-separated) key and saves.
    ///
    /// The key must name an existing field. The new value is validated by
    /// deserializing the whole preference set back, so a wrong type is
    /// rejected and nothing changes.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), PreferencesError> {
        if key.trim().is_empty() {
            return Err(PreferencesError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut json_value = serde_json::to_value(&self.preferences).map_err(|e| {
            PreferencesError::SerializationError(format!("Failed to serialize preferences: {}", e))
        })?;

        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Err(PreferencesError::InvalidKey(key.to_string())),
        };

        let mut current = &mut json_value;
        for part in parents {
            current = current.get_mut(*part).ok_or_else(|| {
                PreferencesError::InvalidKey(format!("Key '{}' not found in preferences", key))
            })?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(*last) => {
                map.insert(last.to_string(), value);
            }
            serde_json::Value::Object(_) => {
                return Err(PreferencesError::InvalidKey(format!(
                    "Key '{}' not found in preferences",
                    key
                )));
            }
            _ => {
                return Err(PreferencesError::InvalidKey(format!(
                    "Cannot navigate to key '{}': intermediate value is not an object",
                    key
                )));
            }
        }

        let updated: HighlightPreferences = serde_json::from_value(json_value).map_err(|e| {
            PreferencesError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.preferences = updated;
        self.save()?;
        Ok(())
    }

    /// Resets all preferences to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), PreferencesError> {
        self.preferences = HighlightPreferences::default();
        self.save()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}

impl PreferencesSource for RwLock<PreferencesEngine> {
    fn get_prefs(&self) -> HighlightPreferences {
        match self.read() {
            Ok(engine) => engine.get_preferences().resolved(),
            Err(_) => {
                warn!("preferences lock poisoned, using defaults");
                HighlightPreferences::default().resolved()
            }
        }
    }
}

impl PreferencesSource for HighlightPreferences {
    fn get_prefs(&self) -> HighlightPreferences {
        self.resolved()
    }
}
