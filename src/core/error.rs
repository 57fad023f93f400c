use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Field name to the messages the server attached to it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error: {message}")]
    Server { status: Option<u16>, message: String },
    #[error("Cannot parse response: {0}")]
    Parse(String),
    #[error("Validation failed: {message}")]
    Validation { message: String, fields: FieldErrors },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Another mutation is in progress")]
    Busy,
    #[error("Cannot parse config: {0}")]
    Config(String),
}

/// Copyable tag of a [`SyncError`], for callers that branch on the class of
/// failure rather than its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Server,
    Parse,
    Validation,
    Conflict,
    NotFound,
    Busy,
    Config,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Network(_) => ErrorKind::Network,
            SyncError::Server { .. } => ErrorKind::Server,
            SyncError::Parse(_) => ErrorKind::Parse,
            SyncError::Validation { .. } => ErrorKind::Validation,
            SyncError::Conflict(_) => ErrorKind::Conflict,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Busy => ErrorKind::Busy,
            SyncError::Config(_) => ErrorKind::Config,
        }
    }

    /// Message suitable for an error banner. Server-supplied text is kept as is.
    pub fn display_message(&self) -> String {
        match self {
            SyncError::Server { message, .. }
            | SyncError::Validation { message, .. }
            | SyncError::Conflict(message)
            | SyncError::NotFound(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Server => "ServerError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Busy => "BusyError",
            ErrorKind::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Parse(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}
