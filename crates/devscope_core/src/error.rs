//! Error types for devscope

use thiserror::Error;

/// Errors raised by the devscope engines.
///
/// Most of these never reach a caller: out-of-range indices are clamped and
/// empty-history navigation is a no-op. They exist so the recovery sites can
/// match on what went wrong.
#[derive(Error, Debug)]
pub enum Error {
    /// A value has no text form (cyclic key, unsupported shape).
    #[error("value cannot be serialized: {0}")]
    SerializationFailure(String),

    /// A time-travel target outside the recorded history.
    #[error("history index {index} out of range for {len} entries")]
    IndexOutOfRange { index: i64, len: usize },

    /// Navigation requested on a history with nothing to navigate.
    #[error("history for store '{0}' is empty")]
    EmptyHistory(String),

    /// Settings could not be loaded or stored.
    #[error("settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for devscope operations
pub type Result<T> = std::result::Result<T, Error>;
