//! Order execution orchestration.
//!
//! A single polling loop fetches pending orders, classifies each into its
//! next action, consults the idempotence cache, dispatches to the right
//! chain module and reports the outcome on a broadcast event bus. Orders
//! are processed sequentially per tick; the cache's check-and-set guards
//! against double broadcast even if ticks ever overlap.

pub mod cache;
pub mod events;
pub mod executor;
pub mod traits;

pub use cache::{CacheEntry, ExecutionCache};
pub use events::{EventBus, ExecutorEvent};
pub use executor::{BuilderError, Executor, ExecutorBuilder, ExecutorConfig, StopHandle};
pub use traits::{
    BlockNumberFetcher, ChainHtlc, DispatchError, FetchError, OrderFilter, OrderbookClient,
    OrderbookError,
};
