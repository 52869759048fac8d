//! Run-scoped state shared by every nested document of one archival run

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::cache::ResourceCache;
use super::output::OutputTransform;
use crate::config::ArchiveConfig;
use crate::fetch::Fetcher;

/// Cache, download slots and cancellation for one run
///
/// Never shared between runs, so independent runs neither see each other's
/// cache nor compete for each other's download slots.
pub struct RunContext {
    pub(crate) config: Arc<ArchiveConfig>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) cache: ResourceCache,
    pub(crate) downloads: Semaphore,
    pub(crate) cancel: CancellationToken,
    pub(crate) output: OutputTransform,
}

impl RunContext {
    #[must_use]
    pub fn new(config: Arc<ArchiveConfig>, fetcher: Arc<dyn Fetcher>, cancel: CancellationToken) -> Self {
        let downloads = Semaphore::new(config.max_concurrent_downloads());
        let output = OutputTransform::new(config.output_mode().clone());
        Self {
            config,
            fetcher,
            cache: ResourceCache::new(),
            downloads,
            cancel,
            output,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Log one subresource access, honoring the logging switches
    pub(crate) fn log_resource(&self, url: &str, parent: &Url, cached: bool) {
        if !self.config.enable_log() {
            return;
        }
        let prefix = if cached { "(CACHE) " } else { "" };
        if self.config.log_parent_url() {
            log::info!("{prefix}{url} (from {parent})");
        } else {
            log::info!("{prefix}{url}");
        }
    }
}

/// A document being processed: its URL, resolution base and output location
#[derive(Debug, Clone)]
pub struct DocumentScope {
    /// Sent as `Referer` for every subresource of this document
    pub url: Url,
    /// `<base href>` when present, otherwise `url`
    pub base: Url,
    /// File this document is written to in directory mode
    pub location: Option<PathBuf>,
    /// Nesting level, 0 for the root document
    pub depth: usize,
}

impl DocumentScope {
    #[must_use]
    pub fn root(url: Url, location: Option<PathBuf>) -> Self {
        Self {
            base: url.clone(),
            url,
            location,
            depth: 0,
        }
    }

    /// Scope of a subresource fetched from this document
    #[must_use]
    pub fn child(&self, url: Url, location: Option<PathBuf>) -> Self {
        Self {
            base: url.clone(),
            url,
            location,
            depth: self.depth + 1,
        }
    }

    /// Same document with a different resolution base
    #[must_use]
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = base;
        self
    }
}
