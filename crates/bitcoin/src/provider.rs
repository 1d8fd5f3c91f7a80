use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;

/// Confirmation status of a transaction or output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
}

/// An unspent output on the HTLC (or wallet) address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    pub status: TxStatus,
}

impl Utxo {
    /// `txid:vout`, the key counterparty SACP signatures are matched by.
    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }
}

/// One output of a fetched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxOutInfo {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

/// A fetched transaction, trimmed to the fields the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxInfo {
    pub txid: String,
    pub status: TxStatus,
    pub vout: Vec<TxOutInfo>,
}

/// Recommended fee rates in sat/vB, fastest to cheapest.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FeeRates {
    #[serde(rename = "fastestFee")]
    pub fastest: f64,
    #[serde(rename = "halfHourFee")]
    pub half_hour: f64,
    #[serde(rename = "hourFee")]
    pub hour: f64,
    #[serde(rename = "economyFee")]
    pub economy: f64,
    #[serde(rename = "minimumFee")]
    pub minimum: f64,
}

impl FeeRates {
    pub fn for_urgency(&self, urgency: FeeUrgency) -> f64 {
        match urgency {
            FeeUrgency::Fastest => self.fastest,
            FeeUrgency::HalfHour => self.half_hour,
            FeeUrgency::Hour => self.hour,
            FeeUrgency::Economy => self.economy,
            FeeUrgency::Minimum => self.minimum,
        }
    }
}

/// How quickly a transaction should confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeeUrgency {
    Fastest,
    HalfHour,
    #[default]
    Hour,
    Economy,
    Minimum,
}

/// Read/broadcast capability against a Bitcoin chain.
///
/// The engine performs no retries through this interface; a failed call
/// fails the current action attempt and the next poll tick starts over.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>>;

    async fn get_transaction(&self, txid: &str) -> Result<TxInfo>;

    /// Broadcast a raw transaction, returning its txid.
    async fn broadcast(&self, tx_hex: &str) -> Result<String>;

    async fn fee_rates(&self) -> Result<FeeRates>;

    /// Current chain tip height.
    async fn latest_tip(&self) -> Result<u64>;

    /// Suggested absolute fee in sats for sending `amount` from `address`.
    async fn suggest_fee(&self, address: &str, amount: u64, urgency: FeeUrgency) -> Result<u64>;
}
