//! Integration tests for skystats-config crate.

use skystats_common::test_utils::init_test_logging;
use skystats_common::{LogFormat, StatsError};
use skystats_config::{ConfigLoader, StoreBackend};
use std::path::PathBuf;

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::new(dir.path().join("absent.toml"));

    let config = loader.load_file().await.unwrap();
    assert_eq!(config.cache.ttl_secs, 3600);
    assert_eq!(config.stats.default_period, "month");
}

#[tokio::test]
async fn test_partial_file_merges_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skystats.toml");
    std::fs::write(
        &path,
        r#"
[server]
bind_addr = "0.0.0.0:3000"

[cache]
ttl_secs = 600

[cache.backend]
type = "file"
directory = "/tmp/skystats-cache"

[logging]
format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load_file().await.unwrap();
    assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
    assert_eq!(config.cache.ttl_secs, 600);
    assert_eq!(
        config.cache.backend,
        StoreBackend::File {
            directory: PathBuf::from("/tmp/skystats-cache")
        }
    );
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.bluesky.page_limit, 100);
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_credentials_and_timezone_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skystats.toml");
    std::fs::write(
        &path,
        r#"
[bluesky]
identifier = "bot.bsky.social"
password = "app-password"

[stats]
timezone = "Asia/Tokyo"
default_period = "week"
"#,
    )
    .unwrap();

    let loaded = ConfigLoader::new(&path).load_file().await.unwrap();
    assert_eq!(loaded.stats.timezone, "Asia/Tokyo");
    assert_eq!(loaded.stats.default_period, "week");
    assert!(loaded.bluesky.has_credentials());
    assert!(loaded.validate().is_ok());
}

#[tokio::test]
async fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[server\nbind_addr = ").unwrap();

    let error = ConfigLoader::new(&path).load_file().await.unwrap_err();
    assert!(matches!(error, StatsError::Config { .. }));
}
