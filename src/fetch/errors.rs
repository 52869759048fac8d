//! Error types for the fetch layer

use std::time::Duration;

/// Failure of a single subresource request
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// DNS, TLS, connection or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success status that is not retried
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// Retryable status kept coming back until the retry budget ran out
    #[error("gave up after {attempts} attempts in {elapsed:?} (last status {last_status})")]
    RetriesExhausted {
        attempts: u32,
        elapsed: Duration,
        last_status: u16,
    },

    /// Connection dropped or errored while streaming the body
    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request canceled")]
    Canceled,
}

impl FetchError {
    /// Statuses worth retrying: any 5xx and 429
    #[must_use]
    pub fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 429
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::HttpStatus {
                status: status.as_u16(),
            };
        }
        if error.is_body() || error.is_decode() {
            return Self::Body(error.to_string());
        }
        Self::Transport(error.to_string())
    }
}

/// Errors raised while reading a Netscape cookie file
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("line {line_number}: {reason}")]
    InvalidLine { line_number: usize, reason: String },

    #[error("failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound { malformed_count: usize },
}
