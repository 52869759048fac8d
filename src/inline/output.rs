//! Output transform: turn a fetched resource into the reference written back
//! into the document
//!
//! Single-file mode always produces a `data:` URL. Directory mode mirrors the
//! resource under `<root>/<host>[_port]/<path>` and returns a path relative to
//! the referencing document; a failed write falls back to a `data:` URL.

use std::path::{Component, Path, PathBuf};

use dashmap::DashSet;
use url::Url;

use super::types::Resource;
use crate::config::OutputMode;
use crate::errors::StorageError;
use crate::utils::mime;

#[derive(Debug)]
pub struct OutputTransform {
    mode: OutputMode,
    written: DashSet<PathBuf>,
}

impl OutputTransform {
    #[must_use]
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            written: DashSet::new(),
        }
    }

    #[must_use]
    pub fn is_single_file(&self) -> bool {
        self.mode.is_single_file()
    }

    /// Where the root document is written, `None` in single-file mode
    #[must_use]
    pub fn entry_location(&self, entry_file_name: &str) -> Option<PathBuf> {
        self.mode
            .directory_root()
            .map(|root| root.join(sanitize_segment(entry_file_name)))
    }

    /// Where a resource is mirrored, `None` in single-file mode
    #[must_use]
    pub fn location_for(&self, url: &Url, content_type: &str) -> Option<PathBuf> {
        let root = self.mode.directory_root()?;
        mirror_path(root, url, content_type)
    }

    /// Reference to write into the document that points at `resource`
    ///
    /// `referrer` is the location of the referencing document in directory mode.
    pub async fn transform(&self, url: &Url, resource: &Resource, referrer: Option<&Path>) -> String {
        let content_type = if resource.content_type.trim().is_empty() {
            mime::sniff_content_type(&resource.content, url.path())
        } else {
            resource.content_type.clone()
        };

        let Some(path) = self.location_for(url, &content_type) else {
            return mime::to_data_url(&resource.content, &content_type);
        };

        if let Err(e) = self.persist(&path, &resource.content).await {
            log::warn!("{e}, inlining {url} instead");
            return mime::to_data_url(&resource.content, &content_type);
        }

        self.relative_reference(&path, referrer)
    }

    /// Write the root document in directory mode
    ///
    /// # Errors
    ///
    /// [`StorageError`] when the directory or file cannot be written.
    pub async fn write_entry(&self, path: &Path, content: &[u8]) -> Result<(), StorageError> {
        write_file(path, content).await
    }

    async fn persist(&self, path: &Path, content: &[u8]) -> Result<(), StorageError> {
        if !self.written.insert(path.to_path_buf()) {
            return Ok(());
        }
        let result = write_file(path, content).await;
        if result.is_err() {
            self.written.remove(path);
        }
        result
    }

    fn relative_reference(&self, target: &Path, referrer: Option<&Path>) -> String {
        let relative = match referrer.and_then(Path::parent) {
            Some(from_dir) => pathdiff::diff_paths(target, from_dir),
            None => self
                .mode
                .directory_root()
                .and_then(|root| target.strip_prefix(root).ok())
                .map(Path::to_path_buf),
        }
        .unwrap_or_else(|| target.to_path_buf());

        to_url_path(&relative)
    }
}

async fn write_file(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let storage_error = |source| StorageError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(storage_error)?;
    }
    tokio::fs::write(path, content).await.map_err(storage_error)
}

/// Mirror location of `url` under `root`
///
/// - directory-like paths become `index.<ext>`
/// - extension-less files gain `.<ext>` from the MIME type
/// - a query string adds an `xxh3` suffix so `a.css?v=1` and `a.css?v=2` differ
#[must_use]
pub fn mirror_path(root: &Path, url: &Url, content_type: &str) -> Option<PathBuf> {
    let host = url.host_str()?;
    let host_dir = match url.port() {
        Some(port) => format!("{host}_{port}"),
        None => host.to_string(),
    };

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();
    let (last, dirs) = segments.split_last().map_or(("", &[][..]), |(last, dirs)| (*last, dirs));

    let ext = mime::extension_for(content_type);
    let mut file_name = if last.is_empty() {
        format!("index.{}", ext.unwrap_or("html"))
    } else {
        let name = sanitize_segment(last);
        match ext {
            Some(ext) if Path::new(&name).extension().is_none() => format!("{name}.{ext}"),
            _ => name,
        }
    };

    if let Some(query) = url.query() {
        let hash = xxhash_rust::xxh3::xxh3_64(query.as_bytes());
        file_name = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{hash:016x}.{ext}"),
            _ => format!("{file_name}-{hash:016x}"),
        };
    }

    let mut path = root.join(sanitize_segment(&host_dir));
    for dir in dirs.iter().filter(|dir| !dir.is_empty()) {
        path.push(sanitize_segment(dir));
    }
    path.push(file_name);
    Some(path)
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned = sanitize_filename::sanitize(segment).replace('#', "_");
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

fn to_url_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().replace(' ', "%20")),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn mirrors_host_and_path() {
        let root = Path::new("/out");
        assert_eq!(
            mirror_path(root, &url("https://x.test/img/a.png"), "image/png").unwrap(),
            PathBuf::from("/out/x.test/img/a.png")
        );
        assert_eq!(
            mirror_path(root, &url("http://x.test:8080/"), "text/html").unwrap(),
            PathBuf::from("/out/x.test_8080/index.html")
        );
        assert_eq!(
            mirror_path(root, &url("https://x.test/fonts/inter"), "font/woff2").unwrap(),
            PathBuf::from("/out/x.test/fonts/inter.woff2")
        );
    }

    #[test]
    fn query_strings_get_distinct_files() {
        let root = Path::new("/out");
        let v1 = mirror_path(root, &url("https://x.test/s.css?v=1"), "text/css").unwrap();
        let v2 = mirror_path(root, &url("https://x.test/s.css?v=2"), "text/css").unwrap();
        assert_ne!(v1, v2);
        assert!(v1.to_string_lossy().ends_with(".css"));
    }

    #[tokio::test]
    async fn single_file_mode_returns_data_url() {
        let output = OutputTransform::new(OutputMode::SingleFile);
        let resource = Resource::new(vec![0xFF, 0xD8], "image/png");
        let reference = output
            .transform(&url("https://x.test/a.png"), &resource, None)
            .await;
        assert_eq!(reference, "data:image/png;base64,/9g=");
    }

    #[tokio::test]
    async fn directory_mode_writes_relative_to_referrer() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputTransform::new(OutputMode::Directory {
            root: dir.path().to_path_buf(),
        });
        let resource = Resource::new(b"body{}".to_vec(), "text/css");
        let referrer = dir.path().join("index.html");

        let reference = output
            .transform(&url("https://x.test/css/site.css"), &resource, Some(&referrer))
            .await;

        assert_eq!(reference, "x.test/css/site.css");
        let written = std::fs::read(dir.path().join("x.test/css/site.css")).unwrap();
        assert_eq!(written, b"body{}");
    }

    #[tokio::test]
    async fn storage_failure_falls_back_to_data_url() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the host directory should go makes create_dir_all fail
        std::fs::write(dir.path().join("x.test"), b"").unwrap();
        let output = OutputTransform::new(OutputMode::Directory {
            root: dir.path().to_path_buf(),
        });
        let resource = Resource::new(vec![0xFF, 0xD8], "image/png");

        let reference = output
            .transform(&url("https://x.test/a/b.png"), &resource, None)
            .await;

        assert_eq!(reference, "data:image/png;base64,/9g=");
    }
}
