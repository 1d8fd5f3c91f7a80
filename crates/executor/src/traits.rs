//! Collaborator capabilities consumed by the executor.

use async_trait::async_trait;
use gardenswap_bitcoin::{BitcoinHtlc, ChainDataProvider, HtlcError, SchnorrSigner};
use gardenswap_types::MatchedOrder;
use thiserror::Error;

/// Filter applied when polling the orderbook.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to orders created by this address, when set.
    pub maker: Option<String>,
}

#[derive(Debug, Error)]
#[error("orderbook error: {0}")]
pub struct OrderbookError(pub String);

/// Source of matched orders awaiting execution.
#[async_trait]
pub trait OrderbookClient: Send + Sync {
    async fn pending_orders(&self, filter: &OrderFilter)
        -> Result<Vec<MatchedOrder>, OrderbookError>;
}

#[derive(Debug, Error)]
#[error("block fetch error: {0}")]
pub struct FetchError(pub String);

/// Current tip height of one chain.
#[async_trait]
pub trait BlockNumberFetcher: Send + Sync {
    async fn block_number(&self) -> Result<u64, FetchError>;
}

/// Error surface of a dispatched HTLC action.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The action was already performed remotely; the executor seeds its
    /// cache from the observed hash instead of retrying.
    #[error("already settled{}", tx_hash.as_deref().map(|h| format!(" in {h}")).unwrap_or_default())]
    AlreadySettled { tx_hash: Option<String> },

    #[error("{0}")]
    Failed(String),
}

/// Uniform HTLC capability, one implementation per chain family.
///
/// Role convention follows the order creator: initiate funds the source
/// leg, redeem claims the destination leg, refund recovers the source leg.
#[async_trait]
pub trait ChainHtlc: Send + Sync {
    async fn initiate(&self, order: &MatchedOrder) -> Result<String, DispatchError>;

    async fn redeem(&self, order: &MatchedOrder, secret: [u8; 32]) -> Result<String, DispatchError>;

    async fn refund(&self, order: &MatchedOrder) -> Result<String, DispatchError>;
}

fn into_dispatch(err: HtlcError) -> DispatchError {
    match err {
        HtlcError::AlreadySettled { tx_hash } => DispatchError::AlreadySettled { tx_hash },
        other => DispatchError::Failed(other.to_string()),
    }
}

#[async_trait]
impl<P, S> ChainHtlc for BitcoinHtlc<P, S>
where
    P: ChainDataProvider + 'static,
    S: SchnorrSigner + 'static,
{
    async fn initiate(&self, order: &MatchedOrder) -> Result<String, DispatchError> {
        BitcoinHtlc::initiate(self, &order.source_swap, None)
            .await
            .map_err(into_dispatch)
    }

    async fn redeem(&self, order: &MatchedOrder, secret: [u8; 32]) -> Result<String, DispatchError> {
        BitcoinHtlc::redeem(self, &order.destination_swap, secret, None)
            .await
            .map_err(into_dispatch)
    }

    async fn refund(&self, order: &MatchedOrder) -> Result<String, DispatchError> {
        BitcoinHtlc::refund(self, &order.source_swap, None)
            .await
            .map_err(into_dispatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_display() {
        let err = DispatchError::AlreadySettled {
            tx_hash: Some("abc".to_string()),
        };
        assert_eq!(err.to_string(), "already settled in abc");
        assert_eq!(
            DispatchError::Failed("boom".to_string()).to_string(),
            "boom"
        );
    }

    #[test]
    fn htlc_errors_map_to_dispatch_errors() {
        let mapped = into_dispatch(HtlcError::AlreadySettled {
            tx_hash: Some("aa".to_string()),
        });
        assert!(matches!(mapped, DispatchError::AlreadySettled { .. }));

        let mapped = into_dispatch(HtlcError::SecretMismatch);
        assert!(matches!(mapped, DispatchError::Failed(_)));
    }
}
