//! Configuration module for archival runs
//!
//! This module provides the `ArchiveConfig` struct and its type-safe builder
//! for configuring archival runs with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{ArchiveConfigBuilder, WithOutputMode};
pub use types::{ArchiveConfig, OutputMode};
