//! Error hierarchy for NoteBot.

use thiserror::Error;

/// Rejection reasons when constructing a [`crate::Message`].
///
/// This is the only error the session core ever hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid role: {role}. Must be 'user' or 'assistant'")]
    InvalidRole { role: String },

    #[error("Message content cannot be empty")]
    EmptyContent,

    #[error("Message content exceeds {max}-character limit ({len} characters)")]
    ContentTooLong { len: usize, max: usize },
}

/// Errors raised by a snapshot storage backend.
///
/// These never leave the storage handler; they are folded into its status.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
