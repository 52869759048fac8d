//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use kodegen_tools_webarchive::ArchiveConfig;
use kodegen_tools_webarchive::config::{ArchiveConfigBuilder, WithOutputMode};

/// Save a web page, with every resource it needs, as a single HTML file.
///
/// Stylesheets, scripts, images, fonts and embedded documents are fetched and
/// embedded as data URLs, so the archive renders without network access.
#[derive(Parser, Debug)]
#[command(name = "kodegen-webarchive")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the page to archive
    pub url: String,

    /// Custom user agent
    #[arg(short = 'u', long)]
    pub user_agent: Option<String>,

    /// File or directory to save the archive to (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Gzip the archive
    #[arg(short = 'z', long)]
    pub gzip: bool,

    /// Disable logging
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Debug logging, with the parent URL of every resource
    #[arg(long)]
    pub verbose: bool,

    /// Remove scripts and event handlers
    #[arg(long)]
    pub no_js: bool,

    /// Remove stylesheets and style attributes
    #[arg(long)]
    pub no_css: bool,

    /// Remove embedded elements (iframe, embed, object)
    #[arg(long)]
    pub no_embeds: bool,

    /// Remove media elements (img, picture, video, audio)
    #[arg(long)]
    pub no_medias: bool,

    /// Maximum simultaneous downloads (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub max_concurrent_download: Option<u16>,

    /// Netscape cookie file
    #[arg(short = 'c', long)]
    pub load_cookies: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Leave failing subresources as links instead of aborting
    #[arg(long)]
    pub tolerant: bool,

    /// Mirror resources into this directory instead of inlining them
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Layer the flags that were given over `config`
    pub fn apply(&self, config: ArchiveConfig) -> ArchiveConfigBuilder<WithOutputMode> {
        let mut builder = config.into_builder();

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if self.no_js {
            builder = builder.disable_js(true);
        }
        if self.no_css {
            builder = builder.disable_css(true);
        }
        if self.no_embeds {
            builder = builder.disable_embeds(true);
        }
        if self.no_medias {
            builder = builder.disable_medias(true);
        }
        if let Some(limit) = self.max_concurrent_download {
            builder = builder.max_concurrent_downloads(usize::from(limit));
        }
        if let Some(secs) = self.timeout {
            builder = builder.request_timeout_secs(secs);
        }
        if self.insecure {
            builder = builder.skip_tls_verification(true);
        }
        if self.tolerant {
            builder = builder.tolerate_errors(true);
        }
        if self.quiet {
            builder = builder.enable_log(false);
        }
        if self.verbose {
            builder = builder.log_parent_url(true);
        }
        if let Some(root) = &self.directory {
            builder = builder.directory(root.clone());
        }

        builder
    }

    /// Default `log` filter for these flags
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "off"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_required() {
        let err = Args::try_parse_from(["kodegen-webarchive"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn defaults_keep_config_values() {
        let args = Args::try_parse_from(["kodegen-webarchive", "https://example.com"]).unwrap();
        let config = args.apply(ArchiveConfig::default()).build().unwrap();

        assert_eq!(config.max_concurrent_downloads(), 10);
        assert!(!config.disable_js());
        assert!(config.output_mode().is_single_file());
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "kodegen-webarchive",
            "https://example.com",
            "--no-js",
            "--no-medias",
            "--max-concurrent-download",
            "4",
            "--tolerant",
            "--verbose",
            "--directory",
            "out",
        ])
        .unwrap();
        let config = args.apply(ArchiveConfig::default()).build().unwrap();

        assert!(config.disable_js());
        assert!(config.disable_medias());
        assert!(!config.disable_css());
        assert_eq!(config.max_concurrent_downloads(), 4);
        assert!(config.tolerate_errors());
        assert!(config.log_parent_url());
        assert_eq!(config.output_mode().directory_root(), Some(&PathBuf::from("out")));
        assert_eq!(args.log_level(), "debug");
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = Args::try_parse_from([
            "kodegen-webarchive",
            "https://example.com",
            "--max-concurrent-download",
            "0",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let err = Args::try_parse_from(["kodegen-webarchive", "https://example.com", "-q", "--verbose"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
