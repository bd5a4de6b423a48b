use std::time::Duration;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// treat every failed turn the same way (log + user-facing notice).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Telegram answers edits that would not change the text with a 400
    /// "message is not modified"; callers treat it as a successful edit.
    pub fn is_not_modified(&self) -> bool {
        match self {
            Error::External(s) => s.contains("message is not modified"),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
