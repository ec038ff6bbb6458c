use std::fmt;

// === StoreError ===

/// Errors raised by highlight persistence stores.
#[derive(Debug)]
pub enum StoreError {
    /// The backing store is gone (host torn down, lock poisoned, store disabled).
    HostUnavailable(String),
    /// Database operation failed.
    DatabaseError(String),
    /// A stored record could not be encoded or decoded.
    SerializationError(String),
}

impl StoreError {
    /// Returns `true` when the failure means the host went away rather than
    /// something unexpected going wrong.
    pub fn is_host_unavailable(&self) -> bool {
        matches!(self, StoreError::HostUnavailable(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::HostUnavailable(msg) => write!(f, "Highlight store unavailable: {}", msg),
            StoreError::DatabaseError(msg) => write!(f, "Highlight store database error: {}", msg),
            StoreError::SerializationError(msg) => {
                write!(f, "Highlight store serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

// === PreferencesError ===

/// Errors related to preference loading and updates.
#[derive(Debug)]
pub enum PreferencesError {
    /// An I/O error occurred while reading or writing preferences.
    IoError(String),
    /// Failed to serialize or deserialize preferences.
    SerializationError(String),
    /// The provided preference key is invalid.
    InvalidKey(String),
    /// The provided preference value is invalid.
    InvalidValue(String),
}

impl fmt::Display for PreferencesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferencesError::IoError(msg) => write!(f, "Preferences I/O error: {}", msg),
            PreferencesError::SerializationError(msg) => {
                write!(f, "Preferences serialization error: {}", msg)
            }
            PreferencesError::InvalidKey(key) => write!(f, "Invalid preference key: {}", key),
            PreferencesError::InvalidValue(msg) => {
                write!(f, "Invalid preference value: {}", msg)
            }
        }
    }
}

impl std::error::Error for PreferencesError {}

// === SchedulerError ===

/// Errors returned by the highlight request scheduler.
#[derive(Debug)]
pub enum SchedulerError {
    /// The scheduler worker has stopped and accepts no more requests.
    Closed,
    /// The request was accepted but its result was never delivered.
    Dropped(String),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Closed => write!(f, "Highlight scheduler is closed"),
            SchedulerError::Dropped(term) => {
                write!(f, "Highlight request dropped before completion: {}", term)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}
