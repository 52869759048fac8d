//! Getter methods for `ArchiveConfig`

use std::time::Duration;

use super::types::{ArchiveConfig, OutputMode};
use crate::fetch::RetryPolicy;

impl ArchiveConfig {
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn disable_js(&self) -> bool {
        self.disable_js
    }

    #[must_use]
    pub fn disable_css(&self) -> bool {
        self.disable_css
    }

    #[must_use]
    pub fn disable_embeds(&self) -> bool {
        self.disable_embeds
    }

    #[must_use]
    pub fn disable_medias(&self) -> bool {
        self.disable_medias
    }

    #[must_use]
    pub fn max_concurrent_downloads(&self) -> usize {
        self.max_concurrent_downloads
    }

    #[must_use]
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn skip_tls_verification(&self) -> bool {
        self.skip_tls_verification
    }

    #[must_use]
    pub fn output_mode(&self) -> &OutputMode {
        &self.output_mode
    }

    #[must_use]
    pub fn entry_file_name(&self) -> &str {
        &self.entry_file_name
    }

    #[must_use]
    pub fn tolerate_errors(&self) -> bool {
        self.tolerate_errors
    }

    #[must_use]
    pub fn max_resource_size(&self) -> usize {
        self.max_resource_size
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn placeholder_max_len(&self) -> usize {
        self.placeholder_max_len
    }

    #[must_use]
    pub fn content_security_policy(&self) -> bool {
        self.content_security_policy
    }

    #[must_use]
    pub fn enable_log(&self) -> bool {
        self.enable_log
    }

    #[must_use]
    pub fn log_parent_url(&self) -> bool {
        self.log_parent_url
    }

    /// Backoff envelope derived from the retry settings
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
            Duration::from_secs(self.retry_max_elapsed_secs),
        )
    }
}
