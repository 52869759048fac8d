use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use url::Url;

use crate::utils::mime;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `<timestamp>-<domain>[-<basename>].<ext>` for an archive of `url`
#[must_use]
pub fn archive_file_name(url: &Url, content_type: &str, now: DateTime<Local>) -> String {
    let mut name = format!(
        "{}-{}",
        now.format(TIMESTAMP_FORMAT),
        url.host_str().unwrap_or("archive")
    );

    let basename = url
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .map(|segment| match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => segment,
        })
        .map(sanitize_filename::sanitize)
        .filter(|basename| !basename.is_empty());
    if let Some(basename) = basename {
        name.push('-');
        name.push_str(&basename);
    }

    let ext = mime::extension_for(content_type).unwrap_or("html");
    sanitize_filename::sanitize(format!("{name}.{ext}"))
}

/// Where to write the archive for an `--output` argument
///
/// An existing directory, or a path ending with a separator, receives an
/// auto-named file. Anything else is used as the file path.
#[must_use]
pub fn resolve_output_path(output: &Path, url: &Url, content_type: &str) -> PathBuf {
    let names_directory = output.is_dir()
        || output
            .as_os_str()
            .to_string_lossy()
            .ends_with(std::path::MAIN_SEPARATOR);
    if names_directory {
        output.join(archive_file_name(url, content_type, Local::now()))
    } else {
        output.to_path_buf()
    }
}
