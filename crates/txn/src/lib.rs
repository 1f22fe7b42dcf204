//! `txngate-txn` — the transactional work coordinator.
//!
//! Runs a caller-supplied unit of work inside a storage transaction,
//! retries it on transient conflicts with full-jitter backoff, bounds the
//! number of concurrent transactions with a FIFO semaphore, and defers
//! domain-event dispatch until the transaction is known to have committed
//! (a commit-scoped outbox).
//!
//! Component map:
//!
//! - [`Semaphore`] — counting admission gate (sole backpressure mechanism
//!   against the storage engine)
//! - [`backoff`] — full-jitter delay computation
//! - [`classify`] — transient-vs-terminal error decision
//! - [`CommitQueue`] — per-attempt buffer of (event, handler) pairs,
//!   flushed after commit or discarded after abort
//! - [`Coordinator`] — the orchestration loop tying it all together

pub mod backoff;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod outbox;
pub mod semaphore;

pub use classify::is_retryable;
pub use config::{CoordinatorConfig, RetryConfig};
pub use coordinator::{Coordinator, TxnContext};
pub use error::{TxnError, TxnResult};
pub use metrics::{TxnMetrics, TxnMetricsSnapshot};
pub use outbox::CommitQueue;
pub use semaphore::{Semaphore, SemaphorePermit};
