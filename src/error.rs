use thiserror::Error;

/// Errors produced while loading, mapping and summarizing challenge results
#[derive(Debug, Error)]
pub enum Error {
    /// A session that cannot be summarized (no rounds, bad timestamp, ...)
    #[error("invalid input for session {session}: {reason}")]
    InvalidInput { session: String, reason: String },

    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The results endpoint answered, but not with something usable
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn invalid_input(session: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            session: session.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
