//! Type-safe builder for `ArchiveConfig` using the typestate pattern
//!
//! The output mode must be chosen before `build()` is available:
//!
//! ```rust
//! # use kodegen_tools_webarchive::config::ArchiveConfig;
//! # fn main() -> Result<(), kodegen_tools_webarchive::ArchiveError> {
//! let config = ArchiveConfig::builder()
//!     .disable_js(true)
//!     .single_file()
//!     .max_concurrent_downloads(4)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{ArchiveConfig, OutputMode};
use crate::errors::ArchiveError;

// Type states for the builder
pub struct WithOutputMode;

pub struct ArchiveConfigBuilder<State = ()> {
    pub(crate) config: ArchiveConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ArchiveConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: ArchiveConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl ArchiveConfig {
    /// Create a builder for configuring an `ArchiveConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ArchiveConfigBuilder<()> {
        ArchiveConfigBuilder::default()
    }

    /// Reopen an existing configuration for overrides
    #[must_use]
    pub fn into_builder(self) -> ArchiveConfigBuilder<WithOutputMode> {
        ArchiveConfigBuilder {
            config: self,
            _phantom: PhantomData,
        }
    }

    /// Check the invariants `build()` enforces
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidRequest`] naming the offending field.
    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.user_agent.trim().is_empty() {
            return Err(ArchiveError::InvalidRequest(
                "user_agent must not be empty".to_string(),
            ));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ArchiveError::InvalidRequest(
                "max_concurrent_downloads must be greater than 0".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ArchiveError::InvalidRequest(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        if let OutputMode::Directory { root } = &self.output_mode {
            if root.as_os_str().is_empty() {
                return Err(ArchiveError::InvalidRequest(
                    "output directory must not be empty".to_string(),
                ));
            }
            if self.entry_file_name.trim().is_empty() {
                return Err(ArchiveError::InvalidRequest(
                    "entry_file_name must not be empty in directory mode".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// Output mode selection is available in every state and always lands in WithOutputMode
impl<State> ArchiveConfigBuilder<State> {
    /// Inline every subresource as a `data:` URL
    pub fn single_file(mut self) -> ArchiveConfigBuilder<WithOutputMode> {
        self.config.output_mode = OutputMode::SingleFile;
        ArchiveConfigBuilder {
            config: self.config,
            _phantom: PhantomData,
        }
    }

    /// Write subresources under `root` and reference them by relative path
    pub fn directory(mut self, root: impl Into<PathBuf>) -> ArchiveConfigBuilder<WithOutputMode> {
        self.config.output_mode = OutputMode::Directory { root: root.into() };
        ArchiveConfigBuilder {
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

// Build method only available once the output mode is chosen
impl ArchiveConfigBuilder<WithOutputMode> {
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidRequest`] when a setting is out of range.
    pub fn build(self) -> Result<ArchiveConfig, ArchiveError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
