//! Storage driver error taxonomy.

use thiserror::Error;

/// Error surfaced by the storage driver.
///
/// Variants fall into two camps, and [`StorageError::is_transient`] is the
/// single source of truth for which camp a variant belongs to:
///
/// - **Transient**: expected to resolve if the same transaction is attempted
///   again shortly after — write/version conflicts (at least one other
///   concurrent writer touched the same document), explicit transient
///   transaction labels from the driver, ambiguous commit results, and
///   connectivity/topology faults.
/// - **Terminal**: invalid use of the API or an unrecognized backend
///   failure. Unrecognized errors default to terminal; silently retrying
///   unclassified errors risks infinite loops and masks bugs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Another concurrent transaction committed a newer version of the same
    /// document first.
    #[error("write conflict on '{key}'")]
    WriteConflict { key: String },

    /// The driver labelled the whole transaction transient (safe to retry
    /// from the top with a fresh handle).
    #[error("transient transaction error: {0}")]
    TransientTransaction(String),

    /// The commit's outcome is unknown (e.g. timeout while awaiting the
    /// acknowledgement). The transaction may have actually committed, so
    /// retried work must tolerate state reflecting a previous attempt.
    #[error("unknown transaction commit result: {0}")]
    UnknownCommitResult(String),

    /// Connection-level fault (socket reset mid-operation).
    #[error("connection reset by peer")]
    ConnectionReset,

    /// Topology fault: the node we talked to is no longer a writable
    /// primary (stepped down or demoted).
    #[error("not writable primary")]
    NotWritablePrimary,

    /// The storage node is shutting down.
    #[error("server is shutting down")]
    ShuttingDown,

    /// Invalid use of the transaction API (e.g. writing through a handle
    /// that was already committed or closed).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Opaque backend failure with no recognized transient signature.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn write_conflict(key: impl Into<String>) -> Self {
        Self::WriteConflict { key: key.into() }
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientTransaction(msg.into())
    }

    pub fn unknown_commit(msg: impl Into<String>) -> Self {
        Self::UnknownCommitResult(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Whether retrying the whole transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::WriteConflict { .. }
                | StorageError::TransientTransaction(_)
                | StorageError::UnknownCommitResult(_)
                | StorageError::ConnectionReset
                | StorageError::NotWritablePrimary
                | StorageError::ShuttingDown
        )
    }
}
