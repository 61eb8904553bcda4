use thiserror::Error;

/// Errors raised while loading or saving the schedule document.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The stored document is not a valid schedule collection.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The store could not be serialized.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The channel-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The push worker has shut down.
    #[error("Push worker stopped")]
    Closed,
}

impl SyncError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Database(_) => "DATABASE_ERROR",
            SyncError::Http(_) => "HTTP_ERROR",
            SyncError::Status { .. } => "UPSTREAM_STATUS",
            SyncError::Decode(_) => "DECODE_ERROR",
            SyncError::Encode(_) => "ENCODE_ERROR",
            SyncError::Config(_) => "CONFIG_ERROR",
            SyncError::Closed => "SYNC_CLOSED",
        }
    }

    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Database(_) => true,
            SyncError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SyncError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            SyncError::Decode(_)
            | SyncError::Encode(_)
            | SyncError::Config(_)
            | SyncError::Closed => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> SyncError {
        SyncError::Status {
            status: code,
            url: "http://host/x".into(),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!status(400).is_transient());
        assert!(!status(403).is_transient());
        assert!(!SyncError::Decode("bad".into()).is_transient());
        assert_eq!(status(404).code(), "UPSTREAM_STATUS");
    }
}
