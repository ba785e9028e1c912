//! Error types for `StockCore`.
//!
//! Two taxonomies, mirroring the layer split:
//!
//! - [`LedgerError`]: storage-layer failures raised by [`StockLedger`]
//!   implementations.
//! - [`CommitError`]: commit-engine failures surfaced to checkout callers.
//!
//! Insufficient stock is deliberately in neither enum. A shortfall is an
//! expected, reportable outcome — it travels as data
//! ([`Validation::Insufficient`] / [`CommitOutcome::Conflicted`]), never as
//! an error, so callers cannot confuse it with a fault.
//!
//! [`StockLedger`]: crate::ledger::StockLedger
//! [`Validation::Insufficient`]: crate::validator::Validation::Insufficient
//! [`CommitOutcome::Conflicted`]: crate::engine::CommitOutcome::Conflicted

use crate::types::{OrderId, ProductId};
use thiserror::Error;

/// Errors raised by stock ledger implementations.
///
/// # Error Handling Strategy
///
/// - **NotFound / Inactive**: recovered locally into structured responses
/// - **AlreadyExists**: onboarding collision; the caller picked a used id
/// - **IntegrityViolation**: a ledger invariant would break — a logic
///   defect, not user error; log and investigate, never retry
/// - **Storage**: backend failure after full rollback; opaque to callers
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The product has no stock record.
    #[error("no stock record for product '{0}'")]
    NotFound(ProductId),

    /// The product's stock record is soft-deactivated.
    #[error("stock record for product '{0}' is inactive")]
    Inactive(ProductId),

    /// A stock record already exists for the product being onboarded.
    #[error("stock record for product '{0}' already exists")]
    AlreadyExists(ProductId),

    /// No committed order exists with the given id. Orders are only ever
    /// created whole, so this is a caller bug or a rolled-back attempt.
    #[error("no committed order with id '{0}'")]
    OrderNotFound(OrderId),

    /// A write would break a ledger invariant
    /// (`current_stock >= 0`, `0 <= reserved_stock <= current_stock`,
    /// `new_stock = previous_stock + quantity_change`).
    ///
    /// The entire write set containing the offending entry is discarded.
    #[error("integrity violation on product '{product_id}': {detail}")]
    IntegrityViolation {
        /// The product whose record would have been corrupted.
        product_id: ProductId,
        /// What would have broken.
        detail: String,
    },

    /// The storage backend failed; the write set was rolled back in full.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Errors surfaced by [`OrderCommitEngine::commit`].
///
/// A conflict (insufficient stock) is **not** here — it is returned as
/// [`CommitOutcome::Conflicted`] data. These variants are the genuine
/// failure paths.
///
/// [`OrderCommitEngine::commit`]: crate::engine::OrderCommitEngine::commit
/// [`CommitOutcome::Conflicted`]: crate::engine::CommitOutcome::Conflicted
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// Lock acquisition exceeded its bounded retry budget. Safe to retry
    /// the whole commit attempt from scratch.
    #[error("product '{product_id}' is busy after {attempts} lock attempts")]
    Busy {
        /// The product whose lock could not be acquired.
        product_id: ProductId,
        /// How many acquisition attempts were made.
        attempts: u32,
    },

    /// A referenced product has no stock record.
    #[error("no stock record for product '{0}'")]
    NotFound(ProductId),

    /// A ledger invariant would have been broken during the write set.
    ///
    /// Should be unreachable when re-validation under lock is correct; it
    /// is checked defensively and indicates a bug in invariant
    /// enforcement. The whole attempt was aborted.
    #[error("integrity violation on product '{product_id}': {detail}")]
    IntegrityViolation {
        /// The product whose record would have been corrupted.
        product_id: ProductId,
        /// What would have broken.
        detail: String,
    },

    /// The ledger failed for a reason other than the above; the attempt
    /// was rolled back in full and no partial state is visible.
    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

/// Type alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Type alias for commit results.
pub type CommitResult<T> = Result<T, CommitError>;

impl From<LedgerError> for CommitError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(product_id) | LedgerError::Inactive(product_id) => {
                Self::NotFound(product_id)
            }
            LedgerError::IntegrityViolation { product_id, detail } => {
                Self::IntegrityViolation { product_id, detail }
            }
            other => Self::Ledger(other),
        }
    }
}
