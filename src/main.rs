//! CLI entry point for the web page archiver.

use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use kodegen_tools_webarchive::content_saver::{gzip_bytes, resolve_output_path, save_output};
use kodegen_tools_webarchive::{
    ArchiveConfig, ArchiveRequest, Archiver, Cookie, parse_netscape_cookies,
};
use url::Url;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first, so --help works without logs
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .filter_module("hyper_util", log::LevelFilter::Off)
        .filter_module("rustls", log::LevelFilter::Off)
        .init();

    let base_config = match &args.config {
        Some(path) => load_config(path).await?,
        None => ArchiveConfig::default(),
    };
    let config = args.apply(base_config).build()?;

    let cookies = match &args.load_cookies {
        Some(path) => load_cookies(path)?,
        None => Vec::new(),
    };
    log::debug!("Loaded {} cookies", cookies.len());

    let archiver = Archiver::new(config);
    let cancel = archiver.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, canceling archival");
            cancel.cancel();
        }
    });

    let request = ArchiveRequest::new(args.url.clone()).with_cookies(cookies);
    let output = archiver
        .archive(request)
        .await
        .with_context(|| format!("archiving {}", args.url))?;

    let mirror_root = archiver.config().output_mode().directory_root();
    match (&args.output, mirror_root) {
        (Some(path), _) => {
            let url = Url::parse(args.url.trim()).context("parsing root URL")?;
            let path = resolve_output_path(path, &url, &output.content_type);
            let saved = save_output(output.content, &path, args.gzip).await?;
            log::info!("Saved archive to {}", saved.display());
        }
        (None, Some(root)) => {
            log::info!("Archive mirrored into {}", root.display());
        }
        (None, None) => {
            let content = if args.gzip {
                gzip_bytes(&output.content, None).context("compressing archive")?
            } else {
                output.content
            };
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content).context("writing archive to stdout")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

async fn load_config(path: &Path) -> Result<ArchiveConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn load_cookies(path: &Path) -> Result<Vec<Cookie>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening cookie file {}", path.display()))?;
    parse_netscape_cookies(BufReader::new(file))
        .with_context(|| format!("parsing cookie file {}", path.display()))
}
