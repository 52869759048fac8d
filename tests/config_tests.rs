//! Tests for the type-safe configuration builder pattern

use kodegen_tools_webarchive::config::ArchiveConfig;
use kodegen_tools_webarchive::{ArchiveError, OutputMode};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_builder_requires_output_mode() {
    // This should not compile if uncommented - output mode not chosen
    // let config = ArchiveConfig::builder().build();

    // This SHOULD compile - output mode chosen
    let config = ArchiveConfig::builder().single_file().build().unwrap();
    assert!(config.output_mode().is_single_file());
}

#[test]
fn test_builder_optional_fields_have_defaults() {
    let config = ArchiveConfig::builder().single_file().build().unwrap();

    assert!(!config.disable_js());
    assert!(!config.disable_css());
    assert!(!config.disable_embeds());
    assert!(!config.disable_medias());
    assert_eq!(config.max_concurrent_downloads(), 10);
    assert_eq!(config.max_retries(), 3);
    assert_eq!(config.max_depth(), 5);
    assert!(!config.tolerate_errors());
    assert!(config.content_security_policy());
    assert!(config.enable_log());
    assert!(!config.log_parent_url());
    assert!(!config.skip_tls_verification());
    assert_eq!(config.entry_file_name(), "index.html");
    assert!(!config.user_agent().is_empty());
}

#[test]
fn test_builder_with_all_optional_fields() {
    let temp_dir = TempDir::new().unwrap();
    let config = ArchiveConfig::builder()
        .user_agent("Mozilla/5.0 test")
        .disable_js(true)
        .disable_css(true)
        .disable_embeds(true)
        .disable_medias(true)
        .max_concurrent_downloads(2)
        .request_timeout_secs(5)
        .max_retries(1)
        .skip_tls_verification(true)
        .tolerate_errors(true)
        .max_resource_size(1024)
        .max_depth(2)
        .content_security_policy(false)
        .directory(temp_dir.path())
        .entry_file_name("page.html")
        .build()
        .unwrap();

    assert_eq!(config.user_agent(), "Mozilla/5.0 test");
    assert!(config.disable_js());
    assert!(config.disable_css());
    assert!(config.disable_embeds());
    assert!(config.disable_medias());
    assert_eq!(config.max_concurrent_downloads(), 2);
    assert_eq!(config.request_timeout_secs(), 5);
    assert_eq!(config.max_retries(), 1);
    assert_eq!(config.retry_policy().max_attempts(), 1);
    assert!(config.skip_tls_verification());
    assert!(config.tolerate_errors());
    assert_eq!(config.max_resource_size(), 1024);
    assert_eq!(config.max_depth(), 2);
    assert!(!config.content_security_policy());
    assert_eq!(
        config.output_mode().directory_root(),
        Some(&temp_dir.path().to_path_buf())
    );
    assert_eq!(config.entry_file_name(), "page.html");
}

#[test]
fn test_builder_rejects_out_of_range_values() {
    let zero_depth = ArchiveConfig::builder().max_depth(0).single_file().build();
    assert!(matches!(zero_depth, Err(ArchiveError::InvalidRequest(_))));

    let blank_agent = ArchiveConfig::builder().user_agent("  ").single_file().build();
    assert!(matches!(blank_agent, Err(ArchiveError::InvalidRequest(_))));

    let empty_root = ArchiveConfig::builder().directory(PathBuf::new()).build();
    assert!(matches!(empty_root, Err(ArchiveError::InvalidRequest(_))));
}

#[test]
fn test_config_file_overrides_only_given_fields() {
    let config: ArchiveConfig = serde_json::from_str(
        r#"{
            "disable_js": true,
            "max_concurrent_downloads": 4,
            "output_mode": { "mode": "directory", "root": "/tmp/archive" }
        }"#,
    )
    .unwrap();

    assert!(config.validate().is_ok());
    assert!(config.disable_js());
    assert!(!config.disable_css());
    assert_eq!(config.max_concurrent_downloads(), 4);
    assert_eq!(config.max_depth(), 5);
    assert_eq!(
        config.output_mode(),
        &OutputMode::Directory {
            root: PathBuf::from("/tmp/archive")
        }
    );
}

#[test]
fn test_into_builder_keeps_values() {
    let config = ArchiveConfig::builder()
        .disable_css(true)
        .single_file()
        .build()
        .unwrap();

    let reopened = config.into_builder().max_depth(3).build().unwrap();

    assert!(reopened.disable_css());
    assert_eq!(reopened.max_depth(), 3);
}
