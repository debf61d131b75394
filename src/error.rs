//! Error types for chatdeck.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed or incomplete command arguments.
    #[error("{0}")]
    Usage(String),

    /// The directory lookup failed or came back empty.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// The search pattern is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    Pattern(String),

    /// No reply target could be determined for an inbound message.
    #[error("Cannot resolve reply target: {0}")]
    Resolution(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl Error {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }
}
