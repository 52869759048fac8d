//! Type definitions for resource inlining

use std::sync::Arc;

use url::Url;

use crate::errors::ArchiveError;
use crate::fetch::{Cookie, CookieJar};
use crate::utils::url_utils::parse_absolute;

/// Fetched (and, for HTML and CSS, already processed) resource content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub content: Arc<[u8]>,
    pub content_type: String,
}

impl Resource {
    #[must_use]
    pub fn new(content: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
        }
    }
}

/// Why a reference was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    DataUrl,
    Fragment,
    /// Not an absolute `scheme://host` URL after resolution
    Invalid,
    /// HTML or CSS nested deeper than the configured bound
    DepthLimit,
    /// Body larger than the configured size cap
    TooLarge,
    /// Fetch or parse failed and the run tolerates subresource errors
    Failed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::Empty => "empty reference",
            SkipReason::DataUrl => "data URL",
            SkipReason::Fragment => "fragment reference",
            SkipReason::Invalid => "invalid URL",
            SkipReason::DepthLimit => "nesting depth limit",
            SkipReason::TooLarge => "resource too large",
            SkipReason::Failed => "failed, tolerated",
        };
        write!(f, "{reason}")
    }
}

/// Outcome of resolving one subresource reference
///
/// Hard failures travel separately as `Err(ArchiveError)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    Skipped(SkipReason),
    Fetched(Resource),
}

impl ResourceOutcome {
    #[must_use]
    pub fn into_resource(self) -> Option<Resource> {
        match self {
            ResourceOutcome::Fetched(resource) => Some(resource),
            ResourceOutcome::Skipped(_) => None,
        }
    }
}

/// How the referencing site intends to use a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Opaque bytes (images, fonts, scripts); CSS responses are still processed
    Asset,
    /// `<link rel=stylesheet>`: always processed as CSS
    Stylesheet,
    /// Embedded document (`iframe`, `embed`, `object`): HTML responses are processed
    Document,
}

/// Input of an archival run
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub url: String,
    /// Pre-fetched root content, skips the root request
    pub input: Option<Resource>,
    pub cookies: CookieJar,
}

impl ArchiveRequest {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            input: None,
            cookies: CookieJar::default(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, content: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        self.input = Some(Resource::new(content, content_type));
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: impl IntoIterator<Item = Cookie>) -> Self {
        for cookie in cookies {
            self.cookies.insert(cookie);
        }
        self
    }

    /// Parsed root URL
    ///
    /// # Errors
    ///
    /// [`ArchiveError::InvalidRequest`] unless the URL is absolute with a host.
    pub fn root_url(&self) -> Result<Url, ArchiveError> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err(ArchiveError::InvalidRequest("root URL is required".to_string()));
        }
        parse_absolute(trimmed).ok_or_else(|| {
            ArchiveError::InvalidRequest(format!("'{trimmed}' is not an absolute URL"))
        })
    }
}

/// Result of an archival run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Snapshot of one resource-bearing node, taken before the document is dropped
#[derive(Debug, Clone)]
pub struct PendingTask {
    /// Value of the marker attribute on the node
    pub id: usize,
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Text content, for `<style>` and inline `<script>`
    pub text: String,
}

impl PendingTask {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Non-blank attribute value
    #[must_use]
    pub fn non_blank_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|value| !value.trim().is_empty())
    }
}

/// Mutation to apply to a marked node once all tasks are done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEdit {
    SetAttribute(String, String),
    RemoveAttribute(String),
    SetText(String),
    /// Replace the node with `<style type="text/css">` holding this CSS
    ReplaceWithStyle(String),
}

/// Edits produced by one task
#[derive(Debug, Clone, Default)]
pub struct TaskEdits {
    pub id: usize,
    pub edits: Vec<NodeEdit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_url_must_be_absolute() {
        assert!(ArchiveRequest::new("https://x.test/page").root_url().is_ok());
        assert!(matches!(
            ArchiveRequest::new("").root_url(),
            Err(ArchiveError::InvalidRequest(_))
        ));
        assert!(matches!(
            ArchiveRequest::new("/relative").root_url(),
            Err(ArchiveError::InvalidRequest(_))
        ));
    }
}
