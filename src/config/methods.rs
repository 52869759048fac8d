//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use super::builder::ArchiveConfigBuilder;

impl<State> ArchiveConfigBuilder<State> {
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Remove scripts, `on*` handlers and `javascript:` links, reveal `<noscript>`
    #[must_use]
    pub fn disable_js(mut self, disable: bool) -> Self {
        self.config.disable_js = disable;
        self
    }

    /// Remove `<style>`, stylesheet links and inline `style` attributes
    #[must_use]
    pub fn disable_css(mut self, disable: bool) -> Self {
        self.config.disable_css = disable;
        self
    }

    /// Remove `<iframe>`, `<embed>` and `<object>`
    #[must_use]
    pub fn disable_embeds(mut self, disable: bool) -> Self {
        self.config.disable_embeds = disable;
        self
    }

    /// Remove images, pictures, figures, video and audio
    #[must_use]
    pub fn disable_medias(mut self, disable: bool) -> Self {
        self.config.disable_medias = disable;
        self
    }

    /// Set the run-wide download concurrency limit
    ///
    /// The limit is shared by every nested document of the run, so a page
    /// with frames never opens more than `limit` connections at once.
    #[must_use]
    pub fn max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.config.max_concurrent_downloads = limit;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the attempts for a 5xx/429 response, initial request included
    #[must_use]
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.max_retries = attempts;
        self
    }

    #[must_use]
    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_max_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn retry_max_elapsed_secs(mut self, secs: u64) -> Self {
        self.config.retry_max_elapsed_secs = secs;
        self
    }

    #[must_use]
    pub fn skip_tls_verification(mut self, skip: bool) -> Self {
        self.config.skip_tls_verification = skip;
        self
    }

    #[must_use]
    pub fn entry_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.entry_file_name = name.into();
        self
    }

    /// Keep going when a subresource fails
    ///
    /// Failed references are logged and left pointing at their absolute URL.
    /// Cancellation still aborts the run.
    #[must_use]
    pub fn tolerate_errors(mut self, tolerate: bool) -> Self {
        self.config.tolerate_errors = tolerate;
        self
    }

    #[must_use]
    pub fn max_resource_size(mut self, bytes: usize) -> Self {
        self.config.max_resource_size = bytes;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    #[must_use]
    pub fn placeholder_max_len(mut self, len: usize) -> Self {
        self.config.placeholder_max_len = len;
        self
    }

    #[must_use]
    pub fn content_security_policy(mut self, enabled: bool) -> Self {
        self.config.content_security_policy = enabled;
        self
    }

    #[must_use]
    pub fn enable_log(mut self, enabled: bool) -> Self {
        self.config.enable_log = enabled;
        self
    }

    #[must_use]
    pub fn log_parent_url(mut self, enabled: bool) -> Self {
        self.config.log_parent_url = enabled;
        self
    }
}
