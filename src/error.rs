//! Error types
//!
//! The simulation itself never fails: invalid pool releases and out-of-range
//! grid cells are silent no-ops. Errors only surface at construction time and
//! at the storage boundary.

use std::fmt;

/// Fatal engine construction / configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No drawing surface was supplied (or the canvas element is missing)
    MissingSurface(String),
    /// A configuration value is out of range
    InvalidConfig(String),
    /// `set_scene` was asked for a scene that was never registered
    UnknownScene(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MissingSurface(what) => write!(f, "missing rendering surface: {}", what),
            EngineError::InvalidConfig(msg) => write!(f, "invalid engine config: {}", msg),
            EngineError::UnknownScene(name) => write!(f, "scene '{}' not found", name),
        }
    }
}

impl std::error::Error for EngineError {}

/// Best-effort key/value storage errors
#[derive(Debug)]
pub enum StorageError {
    /// Storage backend not available (private mode, no window, ...)
    Unavailable,
    /// Backend rejected the operation (quota exceeded, ...)
    Backend(String),
    /// Stored snapshot could not be (de)serialized
    Json(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage unavailable"),
            StorageError::Backend(msg) => write!(f, "storage error: {}", msg),
            StorageError::Json(e) => write!(f, "snapshot (de)serialization failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::UnknownScene("menu".into());
        assert_eq!(err.to_string(), "scene 'menu' not found");
    }

    #[test]
    fn test_storage_error_from_json() {
        let bad = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = StorageError::from(bad);
        assert!(matches!(err, StorageError::Json(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
