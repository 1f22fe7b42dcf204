//! Coordinator error model.

use thiserror::Error;

use txngate_core::DomainError;
use txngate_storage::StorageError;

/// Result type flowing through units of work and the coordinator.
pub type TxnResult<T> = Result<T, TxnError>;

/// Error surfaced by a unit of work or the coordinator itself.
///
/// Transient failures are expected control flow here, so they travel as a
/// discriminated value rather than a panic: the work closure returns
/// `Err(TxnError::Storage(..))` on a conflict and the retry loop recovers.
/// The `From` impls let work code apply `?` to both domain and storage
/// results.
///
/// When retries exhaust, the *last* underlying error is propagated
/// unchanged; attempt counts are available via the metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxnError {
    /// Terminal business failure; never retried.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage driver failure; retried when
    /// [`is_transient`](StorageError::is_transient).
    #[error(transparent)]
    Storage(#[from] StorageError),
}
