//! Per-run resource cache
//!
//! Two maps keyed by canonical URL:
//! - `downloads` holds a single-flight cell per URL, so concurrent references
//!   share one network call. The cell only ever wraps the network fetch,
//!   never HTML or CSS recursion, so mutually referencing stylesheets cannot
//!   wait on each other.
//! - `processed` holds the final content after recursion, written once.
//!
//! No map guard is held across an `.await`.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::types::{Resource, ResourceOutcome};
use crate::errors::ArchiveError;

#[derive(Debug, Default)]
pub struct ResourceCache {
    downloads: DashMap<String, Arc<OnceCell<ResourceOutcome>>>,
    processed: DashMap<String, Resource>,
}

impl ResourceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processed content for `url`, if already stored
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<Resource> {
        self.processed.get(url).map(|entry| entry.value().clone())
    }

    /// Store processed content; the first stored value wins
    pub fn store(&self, url: &str, resource: Resource) {
        self.processed.entry(url.to_string()).or_insert(resource);
    }

    /// Run `download` at most once per URL, concurrent callers share its result
    ///
    /// The flag is `true` only for the call that actually ran `download`.
    /// Errors are not cached, a later caller retries the download.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `download`.
    pub async fn download_once<F, Fut>(
        &self,
        url: &str,
        download: F,
    ) -> Result<(ResourceOutcome, bool), ArchiveError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResourceOutcome, ArchiveError>>,
    {
        let cell = self
            .downloads
            .entry(url.to_string())
            .or_default()
            .value()
            .clone();

        let mut ran = false;
        let outcome = cell
            .get_or_try_init(|| {
                ran = true;
                download()
            })
            .await?
            .clone();
        Ok((outcome, ran))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
