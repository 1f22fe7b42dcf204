//! `txngate-storage` — the storage collaborator boundary.
//!
//! The transaction coordinator treats the storage engine as an opaque
//! collaborator: it opens a transaction handle, hands that handle to the
//! caller's unit of work, and commits or aborts it. This crate defines that
//! boundary ([`StorageEngine`] / [`TransactionHandle`]), the driver error
//! taxonomy the retry classifier recognizes ([`StorageError`]), and an
//! in-memory optimistic engine for tests/dev ([`InMemoryEngine`]).

pub mod engine;
pub mod error;
pub mod in_memory;

pub use engine::{HandleState, StorageEngine, TransactionHandle};
pub use error::StorageError;
pub use in_memory::{InMemoryEngine, MemoryTransaction};
