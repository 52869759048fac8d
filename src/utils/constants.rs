//! Shared configuration constants for the archiver
//!
//! This module contains default values and heuristic thresholds used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default number of simultaneous in-flight downloads for one archival run
///
/// Shared across every recursive invocation (HTML inside HTML, CSS inside HTML),
/// so this bounds connections for the whole run, not per document.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 10;

/// Default per-request timeout: 60 seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default maximum attempts for a retryable request (initial attempt included)
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay before the first retry
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Default cap for a single backoff delay
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 8_000;

/// Default budget for the total time spent retrying one URL
pub const DEFAULT_RETRY_MAX_ELAPSED_SECS: u64 = 30;

/// Default nesting bound for HTML-in-HTML and CSS-in-CSS recursion
///
/// An `<iframe>` whose document contains an `<iframe>` counts as two levels.
/// Cyclic `@import` chains and self-embedding frames stop here.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Largest body embedded into the archive: 64 MiB
pub const DEFAULT_MAX_RESOURCE_SIZE: usize = 64 * 1024 * 1024;

/// Base64 payload length under which a `data:` image in `src` is a lazy-load placeholder
///
/// 100 raw bytes encode to 133 base64 characters. Anything smaller is almost
/// certainly a 1x1 spacer rather than real content.
pub const PLACEHOLDER_DATA_URI_MAX_LEN: usize = 133;

/// File extensions the lazy-image heuristics treat as "looks like an image"
pub const LAZY_IMAGE_EXTENSIONS: &str = "jpg|jpeg|png|webp";

/// Entry document name used in directory output mode
pub const DEFAULT_ENTRY_FILE_NAME: &str = "index.html";

/// Temporary attribute tagging resource-bearing nodes between parse passes
pub const RESOURCE_MARKER_ATTR: &str = "data-archive-ref";

/// Chrome user agent string
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Next update: 2025-04-29 (quarterly schedule)
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
