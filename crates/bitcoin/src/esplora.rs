//! Esplora REST implementation of the chain-data capability.

use async_trait::async_trait;
use tracing::debug;

use crate::error::HtlcError;
use crate::provider::{ChainDataProvider, FeeRates, FeeUrgency, TxInfo, Utxo};
use crate::Result;

/// Estimated virtual size of a 1-input/2-output Taproot funding tx, used
/// only for `suggest_fee`; exact spends size themselves via the two-pass
/// protocol.
const FUNDING_VSIZE_ESTIMATE: f64 = 154.0;

/// Esplora/mempool REST API client.
#[derive(Debug, Clone)]
pub struct EsploraProvider {
    client: reqwest::Client,
    base_url: String,
}

impl EsploraProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| HtlcError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(HtlcError::Network(format!(
                "GET {path} failed: {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| HtlcError::Network(e.to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body)
            .map_err(|e| HtlcError::Network(format!("GET {path}: invalid response: {e}")))
    }
}

#[async_trait]
impl ChainDataProvider for EsploraProvider {
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        self.get_json(&format!("/address/{address}/utxo")).await
    }

    async fn get_transaction(&self, txid: &str) -> Result<TxInfo> {
        self.get_json(&format!("/tx/{txid}")).await
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/tx"))
            .body(tx_hex.to_string())
            .send()
            .await
            .map_err(|e| HtlcError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(HtlcError::Network(format!("broadcast failed: {body}")));
        }
        debug!(txid = %body, "broadcast accepted");
        Ok(body)
    }

    async fn fee_rates(&self) -> Result<FeeRates> {
        self.get_json("/v1/fees/recommended").await
    }

    async fn latest_tip(&self) -> Result<u64> {
        self.get_text("/blocks/tip/height")
            .await?
            .trim()
            .parse()
            .map_err(|e| HtlcError::Network(format!("invalid tip height: {e}")))
    }

    async fn suggest_fee(&self, address: &str, amount: u64, urgency: FeeUrgency) -> Result<u64> {
        let utxos = self.get_utxos(address).await?;
        let balance: u64 = utxos.iter().map(|u| u.value).sum();
        if balance == 0 {
            return Err(HtlcError::NotFunded {
                address: address.to_string(),
            });
        }

        let rate = self.fee_rates().await?.for_urgency(urgency);
        let fee = (rate * FUNDING_VSIZE_ESTIMATE).ceil() as u64;
        if balance < amount + fee {
            return Err(HtlcError::InsufficientFunds {
                required: amount + fee,
                available: balance,
            });
        }
        Ok(fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let provider = EsploraProvider::new("http://localhost:3000/");
        assert_eq!(provider.base_url, "http://localhost:3000");
        assert_eq!(provider.url("/tx"), "http://localhost:3000/tx");
    }

    #[test]
    fn utxo_response_deserializes() {
        let json = r#"[{
            "txid": "aa",
            "vout": 1,
            "value": 75000,
            "status": {"confirmed": true, "block_height": 812000}
        }]"#;
        let utxos: Vec<Utxo> = serde_json::from_str(json).unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].value, 75_000);
        assert_eq!(utxos[0].status.block_height, Some(812_000));
    }

    #[test]
    fn tx_response_deserializes() {
        let json = r#"{
            "txid": "bb",
            "status": {"confirmed": false, "block_height": null},
            "vout": [{"scriptpubkey_address": "bcrt1q...", "value": 1000}]
        }"#;
        let tx: TxInfo = serde_json::from_str(json).unwrap();
        assert!(!tx.status.confirmed);
        assert_eq!(tx.vout[0].value, 1_000);
    }
}
