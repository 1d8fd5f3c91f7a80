use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gardenswap_status::{action_for, order_status};
use gardenswap_types::{Action, Chain, ChainFamily, MatchedOrder, SecretManager};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::ExecutionCache;
use crate::events::{EventBus, ExecutorEvent};
use crate::traits::{BlockNumberFetcher, ChainHtlc, DispatchError, OrderFilter, OrderbookClient};

/// Executor tuning.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Orderbook polling interval (milliseconds).
    pub poll_interval_ms: u64,

    /// Event bus capacity.
    pub event_capacity: usize,

    /// Filter applied to the pending-order poll.
    pub filter: OrderFilter,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000, // 5 seconds
            event_capacity: 256,
            filter: OrderFilter::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// Builder for [`Executor`].
pub struct ExecutorBuilder {
    orderbook: Option<Arc<dyn OrderbookClient>>,
    fetchers: HashMap<Chain, Arc<dyn BlockNumberFetcher>>,
    htlcs: HashMap<ChainFamily, Arc<dyn ChainHtlc>>,
    secrets: Option<SecretManager>,
    config: ExecutorConfig,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self {
            orderbook: None,
            fetchers: HashMap::new(),
            htlcs: HashMap::new(),
            secrets: None,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_orderbook(mut self, orderbook: Arc<dyn OrderbookClient>) -> Self {
        self.orderbook = Some(orderbook);
        self
    }

    pub fn with_block_fetcher(
        mut self,
        chain: Chain,
        fetcher: Arc<dyn BlockNumberFetcher>,
    ) -> Self {
        self.fetchers.insert(chain, fetcher);
        self
    }

    pub fn with_chain_htlc(mut self, family: ChainFamily, htlc: Arc<dyn ChainHtlc>) -> Self {
        self.htlcs.insert(family, htlc);
        self
    }

    pub fn with_secrets(mut self, secrets: SecretManager) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Executor, BuilderError> {
        let orderbook = self.orderbook.ok_or_else(|| BuilderError::MissingField {
            field: "orderbook".to_string(),
        })?;
        let secrets = self.secrets.ok_or_else(|| BuilderError::MissingField {
            field: "secrets".to_string(),
        })?;

        let events = EventBus::new(self.config.event_capacity);
        let (stop, _) = watch::channel(false);
        Ok(Executor {
            orderbook,
            fetchers: self.fetchers,
            htlcs: self.htlcs,
            secrets,
            cache: ExecutionCache::new(),
            events,
            config: self.config,
            stop: Arc::new(stop),
        })
    }
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to stop a running executor. In-flight order actions finish;
/// only the next tick is skipped.
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// What a dispatch produced.
enum DispatchOutcome {
    Broadcast(String),
    Skipped(String),
}

/// Drives matched orders to settlement.
pub struct Executor {
    orderbook: Arc<dyn OrderbookClient>,
    fetchers: HashMap<Chain, Arc<dyn BlockNumberFetcher>>,
    htlcs: HashMap<ChainFamily, Arc<dyn ChainHtlc>>,
    secrets: SecretManager,
    cache: ExecutionCache,
    events: EventBus,
    config: ExecutorConfig,
    stop: Arc<watch::Sender<bool>>,
}

impl Executor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutorEvent> {
        self.events.subscribe()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: self.stop.clone(),
        }
    }

    pub fn cache(&self) -> &ExecutionCache {
        &self.cache
    }

    /// Poll until stopped. Per-order failures are reported on the event
    /// bus; nothing here tears the loop down.
    pub async fn run(&self) {
        let mut stopped = self.stop.subscribe();
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = self.config.poll_interval_ms,
            "executor started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
            }
        }
        info!("executor stopped");
    }

    /// One polling pass over the pending orders.
    pub async fn tick(&self) {
        let orders = match self.orderbook.pending_orders(&self.config.filter).await {
            Ok(orders) => orders,
            Err(e) => {
                // Transient; the next tick re-polls.
                warn!(error = %e, "orderbook poll failed");
                return;
            }
        };
        debug!(count = orders.len(), "processing pending orders");
        for order in &orders {
            self.process_order(order).await;
        }
    }

    async fn process_order(&self, order: &MatchedOrder) {
        if let Err(e) = order.validate() {
            warn!(order_id = %order.order_id, error = %e, "skipping invalid order");
            return;
        }

        let source_block = match self.block_number(order.source_swap.chain).await {
            Ok(height) => height,
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "source block fetch failed");
                return;
            }
        };
        let destination_block = match self.block_number(order.destination_swap.chain).await {
            Ok(height) => height,
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "destination block fetch failed");
                return;
            }
        };

        let status = order_status(order, source_block, destination_block, now_ms());
        let action = action_for(status);
        debug!(order_id = %order.order_id, ?status, %action, "classified order");
        if action == Action::Idle {
            return;
        }

        if !self.cache.try_acquire(&order.order_id, action) {
            debug!(order_id = %order.order_id, %action, "already settled or in flight");
            return;
        }

        match self.dispatch(order, action).await {
            Ok(DispatchOutcome::Broadcast(tx_hash)) => {
                self.cache
                    .complete(&order.order_id, action, tx_hash.clone(), None);
                info!(order_id = %order.order_id, %action, tx_hash = %tx_hash, "action settled");
                self.events.emit(ExecutorEvent::Success {
                    order_id: order.order_id.clone(),
                    action,
                    tx_hash,
                });
            }
            Ok(DispatchOutcome::Skipped(reason)) => {
                self.cache.release(&order.order_id, action);
                debug!(order_id = %order.order_id, %action, reason = %reason, "action skipped");
                self.events.emit(ExecutorEvent::Skipped {
                    order_id: order.order_id.clone(),
                    action,
                    reason,
                });
            }
            Err(e) => {
                if let Some(tx_hash) = remote_settlement(order, action, &e) {
                    // The action already happened on-chain; record it
                    // instead of retrying forever.
                    self.cache
                        .complete(&order.order_id, action, tx_hash.clone(), None);
                    info!(order_id = %order.order_id, %action, tx_hash = %tx_hash, "already settled remotely");
                    self.events.emit(ExecutorEvent::Success {
                        order_id: order.order_id.clone(),
                        action,
                        tx_hash,
                    });
                } else {
                    self.cache.release(&order.order_id, action);
                    warn!(order_id = %order.order_id, %action, error = %e, "action failed");
                    self.events.emit(ExecutorEvent::Failed {
                        order_id: order.order_id.clone(),
                        action,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn dispatch(
        &self,
        order: &MatchedOrder,
        action: Action,
    ) -> Result<DispatchOutcome, DispatchError> {
        match action {
            Action::Initiate => {
                let family = order.source_swap.chain.family();
                if family == ChainFamily::Bitcoin {
                    // Bitcoin initiation is a user-funded deposit to the
                    // HTLC address, not something the executor performs.
                    return Ok(DispatchOutcome::Skipped(
                        "bitcoin initiation is funded by the user wallet".to_string(),
                    ));
                }
                self.htlc(family)?
                    .initiate(order)
                    .await
                    .map(DispatchOutcome::Broadcast)
            }
            Action::Redeem => {
                let family = order.destination_swap.chain.family();
                let secret = self.secrets.derive(order.nonce).secret;
                self.htlc(family)?
                    .redeem(order, secret)
                    .await
                    .map(DispatchOutcome::Broadcast)
            }
            Action::Refund => {
                let family = order.source_swap.chain.family();
                if family == ChainFamily::Evm {
                    return Ok(DispatchOutcome::Skipped(
                        "evm refunds are settled by the relay".to_string(),
                    ));
                }
                self.htlc(family)?
                    .refund(order)
                    .await
                    .map(DispatchOutcome::Broadcast)
            }
            Action::Idle => Ok(DispatchOutcome::Skipped("nothing to do".to_string())),
        }
    }

    fn htlc(&self, family: ChainFamily) -> Result<&Arc<dyn ChainHtlc>, DispatchError> {
        self.htlcs
            .get(&family)
            .ok_or_else(|| DispatchError::Failed(format!("no htlc module for {family:?}")))
    }

    async fn block_number(&self, chain: Chain) -> Result<u64, DispatchError> {
        let fetcher = self
            .fetchers
            .get(&chain)
            .ok_or_else(|| DispatchError::Failed(format!("no block fetcher for {chain}")))?;
        fetcher
            .block_number()
            .await
            .map_err(|e| DispatchError::Failed(e.to_string()))
    }
}

/// Settlement hash to seed the cache with when a dispatch failure actually
/// means "someone else already did this".
fn remote_settlement(order: &MatchedOrder, action: Action, err: &DispatchError) -> Option<String> {
    match err {
        DispatchError::AlreadySettled { tx_hash } => Some(
            tx_hash
                .clone()
                .or_else(|| observed_hash(order, action))
                .unwrap_or_default(),
        ),
        DispatchError::Failed(reason) if mentions_prior_settlement(reason) => {
            Some(observed_hash(order, action).unwrap_or_default())
        }
        _ => None,
    }
}

fn mentions_prior_settlement(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    ["already redeemed", "already refunded", "already initiated", "already fulfilled"]
        .iter()
        .any(|marker| reason.contains(marker))
}

fn observed_hash(order: &MatchedOrder, action: Action) -> Option<String> {
    match action {
        Action::Initiate => order.source_swap.initiate_tx_hash.clone(),
        Action::Redeem => order.destination_swap.redeem_tx_hash.clone(),
        Action::Refund => order.source_swap.refund_tx_hash.clone(),
        Action::Idle => None,
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("System time is before UNIX epoch - clock error")
        .as_millis() as u64
}
