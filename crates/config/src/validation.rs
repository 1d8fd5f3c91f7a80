//! Configuration validation rules.

use crate::config::AppConfig;

/// Check every rule, collecting all violations.
pub fn validate(config: &AppConfig) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();

    if config.orderbook.url.is_empty() {
        issues.push("orderbook.url must be set".to_string());
    } else if !is_http_url(&config.orderbook.url) {
        issues.push(format!(
            "orderbook.url must be an http(s) URL, got {}",
            config.orderbook.url
        ));
    }
    if config.orderbook.poll_interval_ms == 0 {
        issues.push("orderbook.poll_interval_ms must be non-zero".to_string());
    }
    if config.orderbook.timeout_ms == 0 {
        issues.push("orderbook.timeout_ms must be non-zero".to_string());
    }

    if config.bitcoin.esplora_url.is_empty() {
        issues.push("bitcoin.esplora_url must be set".to_string());
    } else if !is_http_url(&config.bitcoin.esplora_url) {
        issues.push(format!(
            "bitcoin.esplora_url must be an http(s) URL, got {}",
            config.bitcoin.esplora_url
        ));
    }
    if !is_hex_key(&config.bitcoin.digest_key) {
        issues.push("bitcoin.digest_key must be 32 bytes of hex".to_string());
    }

    for (name, chain) in &config.evm_chains {
        if !is_http_url(&chain.rpc_url) {
            issues.push(format!("evm_chains.{name}.rpc_url must be an http(s) URL"));
        }
        if chain.htlc_address.is_empty() {
            issues.push(format!("evm_chains.{name}.htlc_address must be set"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn is_hex_key(key: &str) -> bool {
    let key = key.trim_start_matches("0x");
    key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvmChainConfig;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.orderbook.url = "https://orderbook.example".to_string();
        config.bitcoin.esplora_url = "http://localhost:3000".to_string();
        config.bitcoin.digest_key = "ab".repeat(32);
        config
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn all_violations_are_collected() {
        let config = AppConfig::default();
        let issues = validate(&config).unwrap_err();
        assert!(issues.iter().any(|i| i.contains("orderbook.url")));
        assert!(issues.iter().any(|i| i.contains("esplora_url")));
        assert!(issues.iter().any(|i| i.contains("digest_key")));
    }

    #[test]
    fn digest_key_accepts_0x_prefix() {
        let mut config = valid_config();
        config.bitcoin.digest_key = format!("0x{}", "cd".repeat(32));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = valid_config();
        config.orderbook.poll_interval_ms = 0;
        let issues = validate(&config).unwrap_err();
        assert!(issues.iter().any(|i| i.contains("poll_interval_ms")));
    }

    #[test]
    fn evm_chain_rules() {
        let mut config = valid_config();
        config.evm_chains.insert(
            "arbitrum".to_string(),
            EvmChainConfig {
                rpc_url: "ftp://bad".to_string(),
                htlc_address: String::new(),
                timeout_ms: 30000,
            },
        );
        let issues = validate(&config).unwrap_err();
        assert!(issues.iter().any(|i| i.contains("arbitrum.rpc_url")));
        assert!(issues.iter().any(|i| i.contains("arbitrum.htlc_address")));
    }
}
