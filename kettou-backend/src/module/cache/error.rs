use thiserror::Error;

/// Result cache failure.
///
/// Remote variants mean the backend could not answer. They are never a
/// cache miss; a miss is `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("remote table rejected credentials: {0}")]
    Auth(String),

    #[error("remote table rate limit exceeded")]
    RateLimited,

    #[error("remote table unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("remote table unavailable: {0}")]
    Unavailable(String),

    #[error("remote table returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("remote table returned unexpected data: {0}")]
    Malformed(String),

    #[error("local cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("local cache CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CacheError {
    /// Whether the failure came from the remote backend
    pub fn is_remote(&self) -> bool {
        !matches!(self, CacheError::Io(_) | CacheError::Csv(_))
    }
}
