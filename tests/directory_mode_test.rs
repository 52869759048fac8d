//! Directory output mode: resources mirrored to disk, relative references

mod common;

use std::sync::Arc;

use common::{FakeFetcher, PNG_BYTES};
use kodegen_tools_webarchive::{ArchiveConfig, ArchiveRequest, Archiver};

const PAGE: &str = r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="/css/site.css"></head>
<body><img src="img/a.png"><script src="js/app.js"></script></body></html>"#;

fn fetcher() -> FakeFetcher {
    FakeFetcher::new()
        .route(
            "https://x.test/css/site.css",
            "text/css",
            "body{background:url(../img/bg.png)}",
        )
        .route("https://x.test/img/bg.png", "image/png", PNG_BYTES)
        .route("https://x.test/img/a.png", "image/png", PNG_BYTES)
        .route("https://x.test/js/app.js", "application/javascript", "run()")
}

#[tokio::test]
async fn mirrors_resources_with_relative_references() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiveConfig::builder().directory(dir.path()).build().unwrap();
    let archiver = Archiver::new(config).with_fetcher(Arc::new(fetcher()));

    let request = ArchiveRequest::new("https://x.test/").with_input(PAGE.as_bytes().to_vec(), "text/html");
    let output = archiver.archive(request).await.unwrap();
    let html = String::from_utf8(output.content).unwrap();

    assert!(html.contains(r#"href="x.test/css/site.css""#), "{html}");
    assert!(html.contains(r#"<img src="x.test/img/a.png">"#));
    assert!(html.contains(r#"<script src="x.test/js/app.js"></script>"#));
    assert!(!html.contains("data:"));

    let entry = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert_eq!(entry, html);

    let css = std::fs::read_to_string(dir.path().join("x.test/css/site.css")).unwrap();
    assert_eq!(css, r#"body{background:url("../img/bg.png")}"#);

    assert_eq!(std::fs::read(dir.path().join("x.test/img/a.png")).unwrap(), PNG_BYTES);
    assert_eq!(std::fs::read(dir.path().join("x.test/img/bg.png")).unwrap(), PNG_BYTES);
    assert_eq!(std::fs::read_to_string(dir.path().join("x.test/js/app.js")).unwrap(), "run()");
}

#[tokio::test]
async fn custom_entry_file_name_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiveConfig::builder()
        .directory(dir.path())
        .entry_file_name("page.html")
        .build()
        .unwrap();
    let archiver = Archiver::new(config).with_fetcher(Arc::new(FakeFetcher::new()));

    let request = ArchiveRequest::new("https://x.test/")
        .with_input(b"<p>hello</p>".to_vec(), "text/html");
    archiver.archive(request).await.unwrap();

    let entry = std::fs::read_to_string(dir.path().join("page.html")).unwrap();
    assert!(entry.contains("<p>hello</p>"));
    assert!(!entry.contains("Content-Security-Policy"));
}

#[tokio::test]
async fn unwritable_root_falls_back_to_data_urls() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let config = ArchiveConfig::builder().directory(&blocker).build().unwrap();
    let archiver = Archiver::new(config).with_fetcher(Arc::new(fetcher()));

    let request = ArchiveRequest::new("https://x.test/")
        .with_input(br#"<img src="img/a.png">"#.to_vec(), "text/html");
    let output = archiver.archive(request).await.unwrap();
    let html = String::from_utf8(output.content).unwrap();

    assert!(html.contains(r#"<img src="data:image/png;base64,"#), "{html}");
}
