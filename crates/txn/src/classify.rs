//! Transient-vs-terminal error classification.
//!
//! Pure decision function consulted by the retry loop. The default for
//! anything unrecognized is **non-retryable**: silently retrying
//! unclassified errors risks infinite loops and masks bugs.

use crate::error::TxnError;

/// Whether retrying the whole transaction may succeed.
///
/// Retryable: storage write/version conflicts, explicit transient or
/// ambiguous-commit labels from the driver, and connectivity/topology
/// faults. Terminal: every domain error (validation, not-found,
/// unauthorized, business conflicts) and any storage error without a
/// recognized transient signature.
pub fn is_retryable(err: &TxnError) -> bool {
    match err {
        TxnError::Domain(_) => false,
        TxnError::Storage(e) => e.is_transient(),
    }
}
