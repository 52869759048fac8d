//! Fetch client
//!
//! The archiving engine talks to the network only through the [`Fetcher`]
//! trait. [`HttpFetcher`] is the reqwest implementation with user agent,
//! referer, cookie buckets and retry with exponential backoff. Tests plug in
//! scripted fetchers.

pub mod client;
pub mod cookies;
pub mod errors;
pub mod retry;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use url::Url;

pub use client::HttpFetcher;
pub use cookies::{Cookie, CookieJar, parse_netscape_cookies};
pub use errors::{CookieError, FetchError};
pub use retry::RetryPolicy;

/// A single GET for a subresource
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    /// URL of the document that referenced this resource
    pub referer: Option<String>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url, referer: None }
    }

    /// Set the referer, ignored when empty
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        let referer = referer.into();
        self.referer = (!referer.trim().is_empty()).then_some(referer);
        self
    }
}

/// Response headers plus a body that has not been read yet
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Vec<u8>, FetchError>>,
}

impl FetchResponse {
    /// Response with a body already in memory
    #[must_use]
    pub fn from_bytes(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body: futures::stream::once(async move { Ok(body) }).boxed(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Source of subresource bytes
///
/// Implementations return once headers are available. Retryable statuses
/// are handled inside the fetcher; any other status is returned as-is.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}
