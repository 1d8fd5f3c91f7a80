//! Configuration loading: JSON file plus environment overrides.

use std::path::Path;

use thiserror::Error;

use crate::config::AppConfig;
use crate::validation::validate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {}", issues.join("; "))]
    Invalid { issues: Vec<String> },
}

/// Load, override from the environment, and validate.
///
/// Recognized overrides: `GARDENSWAP_ORDERBOOK_URL`,
/// `GARDENSWAP_ESPLORA_URL`, `GARDENSWAP_DIGEST_KEY`,
/// `GARDENSWAP_POLL_INTERVAL_MS`.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: AppConfig = serde_json::from_str(&raw)?;
    apply_env_overrides(&mut config);
    validate(&config).map_err(|issues| ConfigError::Invalid { issues })?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(url) = std::env::var("GARDENSWAP_ORDERBOOK_URL") {
        config.orderbook.url = url;
    }
    if let Ok(url) = std::env::var("GARDENSWAP_ESPLORA_URL") {
        config.bitcoin.esplora_url = url;
    }
    if let Ok(key) = std::env::var("GARDENSWAP_DIGEST_KEY") {
        config.bitcoin.digest_key = key;
    }
    if let Ok(interval) = std::env::var("GARDENSWAP_POLL_INTERVAL_MS") {
        if let Ok(parsed) = interval.parse() {
            config.orderbook.poll_interval_ms = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_json() -> String {
        format!(
            r#"{{
                "network": {{"environment": "local"}},
                "orderbook": {{"url": "https://orderbook.example"}},
                "bitcoin": {{
                    "esplora_url": "http://localhost:3000",
                    "digest_key": "{}"
                }}
            }}"#,
            "ab".repeat(32)
        )
    }

    #[test]
    fn loads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(valid_json().as_bytes()).unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.orderbook.url, "https://orderbook.example");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_from_file("/nonexistent/gardenswap.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_config_reports_issues() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "network": {"environment": "local"},
                "orderbook": {"url": ""},
                "bitcoin": {"esplora_url": "", "digest_key": "short"}
            }"#,
        )
        .unwrap();
        let err = load_from_file(file.path()).unwrap_err();
        match err {
            ConfigError::Invalid { issues } => assert!(issues.len() >= 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
