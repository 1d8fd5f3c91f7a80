//! Shared in-memory fakes for unit tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bitcoin::{Network, Transaction, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::error::HtlcError;
use crate::provider::{ChainDataProvider, FeeRates, FeeUrgency, TxInfo, TxOutInfo, TxStatus, Utxo};
use crate::script::HtlcScript;
use crate::Result;

// x-coordinates of G and 2G.
pub(crate) const TEST_INITIATOR: &str =
    "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
pub(crate) const TEST_REDEEMER: &str =
    "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

pub(crate) fn test_script() -> HtlcScript {
    HtlcScript::new(
        Sha256::digest([0u8; 32]).into(),
        XOnlyPublicKey::from_str(TEST_INITIATOR).unwrap(),
        XOnlyPublicKey::from_str(TEST_REDEEMER).unwrap(),
        144,
        Network::Regtest,
    )
}

/// In-memory chain-data provider recording every broadcast.
#[derive(Default)]
pub(crate) struct MockProvider {
    utxos: Mutex<HashMap<String, Vec<Utxo>>>,
    txs: Mutex<HashMap<String, TxInfo>>,
    broadcasts: Mutex<Vec<String>>,
    tip: AtomicU64,
    next_txid: AtomicU64,
    broadcast_error: Mutex<Option<String>>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self {
            tip: AtomicU64::new(1_000),
            ..Self::default()
        }
    }

    /// Credit `address` with a synthetic UTXO; `height` of `None` means
    /// unconfirmed. Returns the synthetic txid.
    pub(crate) fn fund(&self, address: &str, value: u64, height: Option<u64>) -> String {
        let txid = format!("{:064x}", self.next_txid.fetch_add(1, Ordering::SeqCst) + 1);
        let status = TxStatus {
            confirmed: height.is_some(),
            block_height: height,
        };
        self.utxos
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push(Utxo {
                txid: txid.clone(),
                vout: 0,
                value,
                status: status.clone(),
            });
        self.txs.lock().unwrap().insert(
            txid.clone(),
            TxInfo {
                txid: txid.clone(),
                status,
                vout: vec![TxOutInfo {
                    scriptpubkey_address: Some(address.to_string()),
                    value,
                }],
            },
        );
        txid
    }

    pub(crate) fn set_tip(&self, height: u64) {
        self.tip.store(height, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_broadcast(&self, message: &str) {
        *self.broadcast_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    pub(crate) fn last_broadcast(&self) -> Option<String> {
        self.broadcasts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChainDataProvider for MockProvider {
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        Ok(self
            .utxos
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_transaction(&self, txid: &str) -> Result<TxInfo> {
        self.txs
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or_else(|| HtlcError::Network(format!("unknown tx {txid}")))
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String> {
        if let Some(message) = self.broadcast_error.lock().unwrap().take() {
            return Err(HtlcError::Network(message));
        }
        let bytes = hex::decode(tx_hex).map_err(|e| HtlcError::Network(e.to_string()))?;
        let tx: Transaction = bitcoin::consensus::deserialize(&bytes)
            .map_err(|e| HtlcError::Network(e.to_string()))?;
        self.broadcasts.lock().unwrap().push(tx_hex.to_string());
        Ok(tx.compute_txid().to_string())
    }

    async fn fee_rates(&self) -> Result<FeeRates> {
        Ok(FeeRates {
            fastest: 10.0,
            half_hour: 5.0,
            hour: 2.0,
            economy: 1.0,
            minimum: 1.0,
        })
    }

    async fn latest_tip(&self) -> Result<u64> {
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn suggest_fee(&self, _address: &str, _amount: u64, _urgency: FeeUrgency) -> Result<u64> {
        Ok(500)
    }
}
