use serde::Serialize;
use thiserror::Error;

/// Unified error type for the change tracker.
///
/// Per-file indexing problems never surface here from planning; they are
/// contained at the file boundary. This covers misuse and setup failures,
/// serialized for the UI layer to handle.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum TrackerError {
    #[error("Tracker is not ready")]
    NotReady,

    #[error("Indexer error for {path}: {message}")]
    Index { path: String, message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("Watch error: {message}")]
    Watch { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl TrackerError {
    /// Create an Index error for a file
    pub fn index(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Index {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a Watch error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (caller can retry or take action)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Becomes ready once initialization completes
            // Indexers and the filesystem may be transiently unavailable
            Self::NotReady | Self::Index { .. } | Self::Watch { .. } | Self::Io { .. } => true,
            // A bad config stays bad until someone edits it
            Self::Config { .. } => false,
        }
    }
}

impl From<crate::config::ConfigError> for TrackerError {
    fn from(err: crate::config::ConfigError) -> Self {
        TrackerError::config(err.to_string())
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::io(err.to_string())
    }
}

impl From<TrackerError> for String {
    fn from(err: TrackerError) -> Self {
        err.to_string()
    }
}
