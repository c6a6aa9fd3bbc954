//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while parsing or encoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Non-finite coordinate in {0} message")]
    NonFinite(&'static str),

    #[error("Invalid color: {0:?}")]
    InvalidColor(String),
}
