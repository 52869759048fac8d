//! Web page archiver
//!
//! Fetches a page and every subresource it references, recursively through
//! stylesheets and embedded documents, and produces either one
//! self-contained HTML file where every reference is a `data:` URL, or a
//! mirrored directory tree with relative references.

pub mod config;
pub mod content_saver;
pub mod errors;
pub mod fetch;
pub mod inline;
pub mod utils;

pub use config::{ArchiveConfig, ArchiveConfigBuilder, OutputMode};
pub use errors::{ArchiveError, DocumentKind, Result, StorageError};
pub use fetch::{
    Cookie, CookieError, CookieJar, FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher,
    RetryPolicy, parse_netscape_cookies,
};
pub use inline::{
    ArchiveOutput, ArchiveRequest, Archiver, Resource, ResourceKind, ResourceOutcome, SkipReason,
};
pub use utils::{UrlResolver, canonical_key, is_valid_url};

/// Archive one page with a fresh [`Archiver`]
///
/// # Errors
///
/// See [`Archiver::archive`].
pub async fn archive(request: ArchiveRequest, config: ArchiveConfig) -> Result<ArchiveOutput> {
    Archiver::new(config).archive(request).await
}
