//! Error taxonomy for an archival run
//!
//! Skipped references are not errors: they travel as
//! [`ResourceOutcome::Skipped`](crate::inline::ResourceOutcome) and never
//! reach the caller. Storage failures in directory mode are recovered where
//! they happen by falling back to a data URL.

use std::path::PathBuf;

use crate::fetch::FetchError;

/// What kind of document failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Html => write!(f, "HTML"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Rejected before any network activity
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to parse {kind} from {url}: {reason}")]
    Parse {
        url: String,
        kind: DocumentKind,
        reason: String,
    },

    #[error("archival run was canceled")]
    Canceled,
}

impl ArchiveError {
    pub(crate) fn fetch(url: impl Into<String>, source: FetchError) -> Self {
        match source {
            FetchError::Canceled => Self::Canceled,
            source => Self::Fetch {
                url: url.into(),
                source,
            },
        }
    }

    pub(crate) fn parse(url: impl Into<String>, kind: DocumentKind, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// URL the error is about, when it concerns a specific resource
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Fetch { url, .. } | Self::Parse { url, .. } => Some(url),
            Self::InvalidRequest(_) | Self::Canceled => None,
        }
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Directory-mode write failure, recovered by inlining the resource instead
#[derive(Debug, thiserror::Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct StorageError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
