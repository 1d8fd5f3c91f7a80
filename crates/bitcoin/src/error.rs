use thiserror::Error;

/// Which way a counterparty signature failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFault {
    Missing,
    Invalid,
}

impl std::fmt::Display for SignatureFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureFault::Missing => f.write_str("missing"),
            SignatureFault::Invalid => f.write_str("invalid"),
        }
    }
}

/// Errors raised while constructing or settling a Taproot HTLC.
///
/// These are terminal for the current action attempt; retry policy belongs
/// to the caller (the executor retries by re-polling, never in here).
#[derive(Debug, Error)]
pub enum HtlcError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("address {address} holds no spendable outputs")]
    NotFunded { address: String },

    #[error("insufficient funds: need {required} sats, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("timelock not expired: {blocks_remaining} blocks remaining")]
    TimelockNotExpired { blocks_remaining: u64 },

    #[error("secret does not hash to the leg's secret hash")]
    SecretMismatch,

    #[error("counterparty signature {fault} for utxo {utxo}")]
    CounterpartySignature { utxo: String, fault: SignatureFault },

    #[error("unsupported script or address type: {reason}")]
    ScriptType { reason: String },

    #[error("control block generation failed for {leaf}")]
    ControlBlockGeneration { leaf: String },

    #[error("sighash computation failed: {0}")]
    Sighash(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("already settled{}", tx_hash.as_deref().map(|h| format!(" in {h}")).unwrap_or_default())]
    AlreadySettled { tx_hash: Option<String> },
}

impl HtlcError {
    pub fn validation(reason: impl Into<String>) -> Self {
        HtlcError::Validation {
            reason: reason.into(),
        }
    }

    pub fn script_type(reason: impl Into<String>) -> Self {
        HtlcError::ScriptType {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = HtlcError::TimelockNotExpired {
            blocks_remaining: 11,
        };
        assert_eq!(err.to_string(), "timelock not expired: 11 blocks remaining");

        let err = HtlcError::CounterpartySignature {
            utxo: "ab:0".to_string(),
            fault: SignatureFault::Missing,
        };
        assert_eq!(err.to_string(), "counterparty signature missing for utxo ab:0");
    }

    #[test]
    fn already_settled_with_and_without_hash() {
        let bare = HtlcError::AlreadySettled { tx_hash: None };
        assert_eq!(bare.to_string(), "already settled");
        let with = HtlcError::AlreadySettled {
            tx_hash: Some("deadbeef".to_string()),
        };
        assert_eq!(with.to_string(), "already settled in deadbeef");
    }
}
