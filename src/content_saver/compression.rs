use anyhow::{Context, Result};
use flate2::{Compression, GzBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::time::timeout;

/// Timeout for the blocking write + compression
const BLOCKING_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Gzip `content`, recording `filename` in the gzip header when given
///
/// # Errors
///
/// Only I/O errors from the in-memory encoder.
pub fn gzip_bytes(content: &[u8], filename: Option<&str>) -> std::io::Result<Vec<u8>> {
    let mut builder = GzBuilder::new();
    if let Some(filename) = filename {
        builder = builder.filename(filename);
    }
    let mut gz = builder.write(Vec::new(), Compression::new(3));
    gz.write_all(content)?;
    gz.finish()
}

/// Path actually written for `path`, `.gz` appended when compressing
#[must_use]
pub fn output_path(path: &Path, gzip: bool) -> PathBuf {
    let already_gz = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if !gzip || already_gz {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Save the archive atomically: write a temp file next to the target, then
/// rename it over the target
///
/// Returns the path written, which gains `.gz` when `gzip` is set.
///
/// # Errors
///
/// When the parent directory cannot be created, or the write or rename fails.
pub async fn save_output(content: Vec<u8>, path: &Path, gzip: bool) -> Result<PathBuf> {
    let target = output_path(path, gzip);
    let parent_dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent_dir)
        .await
        .with_context(|| format!("creating {}", parent_dir.display()))?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);
    let target_for_task = target.clone();
    let content_len = content.len();

    let blocking_task = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut temp_file = NamedTempFile::new_in(&parent_dir)?;
        if gzip {
            let compressed = gzip_bytes(&content, filename.as_deref())?;
            temp_file.write_all(&compressed)?;
        } else {
            temp_file.write_all(&content)?;
        }
        temp_file.persist(&target_for_task)?;
        Ok(())
    });

    match timeout(BLOCKING_WRITE_TIMEOUT, blocking_task).await {
        Ok(Ok(result)) => result.with_context(|| format!("writing {}", target.display()))?,
        Ok(Err(e)) => return Err(anyhow::anyhow!("Blocking write task panicked: {e}")),
        Err(_) => {
            log::warn!(
                "Blocking write timeout for file: {:?} (size: {content_len} bytes, timeout: {BLOCKING_WRITE_TIMEOUT:?})",
                target
            );
            return Err(anyhow::anyhow!(
                "Write timed out after {BLOCKING_WRITE_TIMEOUT:?} - possible filesystem hang or extremely slow disk"
            ));
        }
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn gz_extension_is_appended_once() {
        assert_eq!(output_path(Path::new("a/page.html"), true), PathBuf::from("a/page.html.gz"));
        assert_eq!(output_path(Path::new("a/page.html.gz"), true), PathBuf::from("a/page.html.gz"));
        assert_eq!(output_path(Path::new("a/page.html"), false), PathBuf::from("a/page.html"));
    }

    #[tokio::test]
    async fn saves_plain_and_gzipped_output() {
        let dir = tempfile::tempdir().unwrap();

        let plain = save_output(b"<html></html>".to_vec(), &dir.path().join("nested/page.html"), false)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&plain).unwrap(), b"<html></html>");

        let gz = save_output(b"<html></html>".to_vec(), &dir.path().join("page.html"), true)
            .await
            .unwrap();
        assert!(gz.to_string_lossy().ends_with("page.html.gz"));

        let mut decoded = String::new();
        GzDecoder::new(std::fs::File::open(&gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "<html></html>");
    }
}
