//! Core configuration types for an archival run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::constants::{
    DEFAULT_ENTRY_FILE_NAME, DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_RESOURCE_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_RETRY_MAX_ELAPSED_SECS,
    DEFAULT_USER_AGENT, PLACEHOLDER_DATA_URI_MAX_LEN,
};

/// Where fetched subresources end up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputMode {
    /// Everything inlined as `data:` URLs into one HTML document
    #[default]
    SingleFile,
    /// Subresources written under `root`, referenced by relative path
    Directory { root: PathBuf },
}

impl OutputMode {
    #[must_use]
    pub fn is_single_file(&self) -> bool {
        matches!(self, OutputMode::SingleFile)
    }

    #[must_use]
    pub fn directory_root(&self) -> Option<&PathBuf> {
        match self {
            OutputMode::Directory { root } => Some(root),
            OutputMode::SingleFile => None,
        }
    }
}

/// Settings for one archival run
///
/// Deserializes with defaults for every missing field, so a JSON config file
/// only needs the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub(crate) user_agent: String,

    pub(crate) disable_js: bool,
    pub(crate) disable_css: bool,
    pub(crate) disable_embeds: bool,
    pub(crate) disable_medias: bool,

    /// Simultaneous in-flight downloads for the whole run, recursion included
    pub(crate) max_concurrent_downloads: usize,
    pub(crate) request_timeout_secs: u64,

    /// Attempts for a retryable response, initial request included
    pub(crate) max_retries: u32,
    pub(crate) retry_base_delay_ms: u64,
    pub(crate) retry_max_delay_ms: u64,
    pub(crate) retry_max_elapsed_secs: u64,

    pub(crate) skip_tls_verification: bool,

    pub(crate) output_mode: OutputMode,
    /// File name of the root document in directory mode
    pub(crate) entry_file_name: String,

    /// Leave failed subresources unrewritten instead of aborting the document
    pub(crate) tolerate_errors: bool,

    /// Bodies larger than this are left as remote references
    pub(crate) max_resource_size: usize,

    /// Nesting bound for HTML and CSS recursion
    pub(crate) max_depth: usize,

    /// Encoded length under which a `data:` image is considered a placeholder
    pub(crate) placeholder_max_len: usize,

    /// Add CSP and source meta tags to single-file documents
    pub(crate) content_security_policy: bool,

    /// Log one record per fetched subresource
    pub(crate) enable_log: bool,
    pub(crate) log_parent_url: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            disable_js: false,
            disable_css: false,
            disable_embeds: false,
            disable_medias: false,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            retry_max_elapsed_secs: DEFAULT_RETRY_MAX_ELAPSED_SECS,
            skip_tls_verification: false,
            output_mode: OutputMode::SingleFile,
            entry_file_name: DEFAULT_ENTRY_FILE_NAME.to_string(),
            tolerate_errors: false,
            max_resource_size: DEFAULT_MAX_RESOURCE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            placeholder_max_len: PLACEHOLDER_DATA_URI_MAX_LEN,
            content_security_policy: true,
            enable_log: true,
            log_parent_url: false,
        }
    }
}
