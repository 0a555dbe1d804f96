//! Error types for Gigasheet API operations.

use thiserror::Error;

/// Errors returned by the Gigasheet client.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable client configuration, such as an absent API key.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request failed before a response was received (connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the service.
        message: String,
    },

    /// A success response whose body did not have the expected shape.
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// Caller input rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A polled job reached a status that is neither pending nor processed.
    #[error("bad status on handle {handle}: {status}")]
    JobFailed {
        /// The polled handle.
        handle: String,
        /// The status reported by the service.
        status: String,
    },

    /// Polling gave up before the job finished.
    #[error(
        "handle {handle} still not done after {tries} tries, last status was: {}{}",
        last_status.as_deref().unwrap_or("unknown"),
        last_error.as_deref().map(|e| format!(", last error: {e}")).unwrap_or_default()
    )]
    WaitExhausted {
        /// The polled handle.
        handle: String,
        /// Number of polls made.
        tries: u32,
        /// Last status observed, if any poll succeeded.
        last_status: Option<String>,
        /// Last polling error, if any poll failed.
        last_error: Option<String>,
    },
}

impl Error {
    /// HTTP status carried by an [`Error::Api`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when no response was obtained from the service.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// True when the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }

    pub(crate) fn empty_handle() -> Self {
        Self::InvalidArgument("empty value for handle".to_string())
    }
}

/// Result type for Gigasheet operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_carries_status() {
        let err = Error::Api {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_network());
        assert_eq!(err.to_string(), "API error: 403 - forbidden");
    }

    #[test]
    fn test_wait_exhausted_message() {
        let err = Error::WaitExhausted {
            handle: "abc".to_string(),
            tries: 3,
            last_status: None,
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "handle abc still not done after 3 tries, last status was: unknown"
        );

        let err = Error::WaitExhausted {
            handle: "abc".to_string(),
            tries: 2,
            last_status: None,
            last_error: Some("API error: 404 - no such sheet".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "handle abc still not done after 2 tries, last status was: unknown, \
             last error: API error: 404 - no such sheet"
        );
        assert_eq!(err.status(), None);
    }
}
