use std::fs;
use std::time::Duration;

use orbis_gateway::application::Gateway;
use orbis_gateway::domain::Strategy;
use orbis_gateway::error::{ConfigError, Error};
use orbis_gateway::infrastructure::config::settings::API_KEY_ENV;
use orbis_gateway::infrastructure::config::Config;
use orbis_gateway::testkit::config::config;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn full_file_round_trips_into_gateway_settings() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
timezone = "-05:00"

[api]
endpoint = "https://example.test/graphql"
timeout_ms = 5000
min_request_interval_ms = 500

[cache]
directory = "/tmp/orbis-cache"
ttl_secs = 120
identifier_ttl_secs = 600

[batch]
max_ids_per_query = 10

[concurrency]
max_concurrent = 2
inter_task_delay_ms = 0

[pagination]
page_size = 100
max_scan_pages = 3

[resolver]
strategies = ["parse_identifier", "exact_name", "local_snapshot"]

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.api.endpoint, "https://example.test/graphql");
    assert_eq!(
        config.cache.resolved_directory(),
        std::path::PathBuf::from("/tmp/orbis-cache")
    );

    let settings = config.gateway_settings().unwrap();
    assert_eq!(settings.executor.timeout, Duration::from_secs(5));
    assert_eq!(settings.executor.min_interval, Duration::from_millis(500));
    assert_eq!(settings.cache_ttl, Duration::from_secs(120));
    assert_eq!(settings.resolver.identifier_ttl, Duration::from_secs(600));
    assert_eq!(settings.resolver.max_scan_pages, 3);
    assert_eq!(settings.max_ids_per_query, 10);
    assert_eq!(settings.max_concurrent, 2);
    assert_eq!(settings.inter_task_delay, Duration::ZERO);
    assert_eq!(settings.page_size, 100);
    assert_eq!(settings.local_offset.local_minus_utc(), -5 * 3600);
    assert_eq!(
        settings.resolver.strategies,
        vec![
            Strategy::ParseIdentifier,
            Strategy::ExactName,
            Strategy::LocalSnapshot
        ]
    );
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[batch\nmax_ids_per_query = 3");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn unknown_strategy_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[resolver]\nstrategies = [\"guess\"]");
    assert!(Config::load(&path).is_err());
}

#[test]
fn unknown_logging_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[logging]\nformat = \"xml\"");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue { field: "format", .. })
    ));
}

#[test]
fn api_key_comes_only_from_the_environment() {
    std::env::set_var(API_KEY_ENV, "  from-env  ");
    let config = Config::parse_toml("api_key = \"from-file\"").unwrap();
    assert_eq!(config.api_key().unwrap(), "from-env");

    std::env::set_var(API_KEY_ENV, "");
    let config = Config::parse_toml("").unwrap();
    assert!(matches!(
        config.api_key(),
        Err(Error::Config(ConfigError::MissingField { field: API_KEY_ENV }))
    ));
    std::env::remove_var(API_KEY_ENV);
}

#[tokio::test]
async fn opened_gateway_persists_under_the_cache_directory() {
    let dir = TempDir::new().unwrap();
    let mut config = config();
    config.cache.directory = Some(dir.path().to_path_buf());

    let gateway = Gateway::open(&config).unwrap();
    assert!(gateway.cache_info().await.unwrap().is_empty());
    let id = gateway.resolve_identifier("9445").await.unwrap();
    assert_eq!(id.canonical_id(), Some(9445));
    assert_eq!(gateway.requests_sent(), 0);
    gateway.close();

    let reopened = Gateway::open(&config).unwrap();
    let keys: Vec<String> = reopened
        .cache_info()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["resolved:9445".to_string()]);
}
