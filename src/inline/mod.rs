//! Resource inlining engine
//!
//! Resolves every subresource a page references (stylesheets, scripts,
//! images, fonts, embedded documents) and rewrites the references so the
//! page renders offline, either as one self-contained HTML file or as a
//! mirrored directory tree.

pub mod cache;
pub mod context;
pub mod css;
mod dom;
pub mod downloaders;
pub mod normalize;
pub mod orchestrator;
pub mod output;
pub mod processors;
pub mod types;

// Re-exports for public API
pub use cache::ResourceCache;
pub use context::{DocumentScope, RunContext};
pub use css::{UrlSpan, collect_url_spans, process_css};
pub use orchestrator::{ARCHIVE_CONTENT_TYPE, Archiver};
pub use output::{OutputTransform, mirror_path};
pub use types::{
    ArchiveOutput, ArchiveRequest, NodeEdit, PendingTask, Resource, ResourceKind, ResourceOutcome,
    SkipReason, TaskEdits,
};
