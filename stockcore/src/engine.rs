//! The atomic order commit engine.
//!
//! The engine turns a feasible [`OrderIntent`] into a persisted [`Order`]
//! plus correlated stock decrements and audit movements, with a hard
//! guarantee that failure leaves zero observable change.
//!
//! A commit attempt moves through `Received -> Locking -> Validating ->
//! Writing -> Committed`, or aborts from `Validating` with a conflict
//! report. There is no partially-committed state reachable by callers:
//! the write step either completes in full or the whole attempt is
//! discarded.

use crate::errors::{CommitError, CommitResult};
use crate::ledger::StockLedger;
use crate::locks::{LockConfig, ProductLockManager};
use crate::order::{Order, OrderIntent};
use crate::stock::{MovementType, NewMovement};
use crate::types::{OrderId, QuantityDelta, Timestamp};
use crate::validator::{ConflictReport, ConflictValidator, Validation};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// The terminal result of a commit attempt that did not fail outright.
///
/// A conflict is an expected, reported outcome — ordinary control flow,
/// distinct from the error paths in [`CommitError`]. Callers render the
/// report directly; no second query is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The order and its whole write set were persisted.
    Committed(Order),
    /// One or more lines could not be satisfied; nothing was written.
    Conflicted(ConflictReport),
}

impl CommitOutcome {
    /// Whether the attempt committed.
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// The committed order, if the attempt committed.
    pub const fn order(&self) -> Option<&Order> {
        match self {
            Self::Committed(order) => Some(order),
            Self::Conflicted(_) => None,
        }
    }

    /// The conflict report, if the attempt was rejected.
    pub const fn conflicts(&self) -> Option<&ConflictReport> {
        match self {
            Self::Committed(_) => None,
            Self::Conflicted(report) => Some(report),
        }
    }
}

/// Orchestrates atomic order commits against a stock ledger.
///
/// # Concurrency
///
/// Every commit acquires per-product exclusive leases in sorted product-id
/// order before validating or writing, so concurrent commits over
/// overlapping product sets serialize per product and cannot deadlock.
/// Advisory pre-flight validation (via [`validator`](Self::validator))
/// takes no lease and may observe stale availability; the engine always
/// re-validates under lock before writing.
///
/// # Cancellation
///
/// Dropping the future returned by [`commit`](Self::commit) during the
/// locking or validating phases aborts cleanly: leases release on drop
/// and nothing has been written. Once the write step has been reached the
/// ledger applies the write set as one unit, so a dropped future cannot
/// leave partial state behind.
#[derive(Debug)]
pub struct OrderCommitEngine<L> {
    ledger: Arc<L>,
    validator: ConflictValidator<L>,
    locks: ProductLockManager,
    lock_config: LockConfig,
}

impl<L> OrderCommitEngine<L>
where
    L: StockLedger,
{
    /// Creates an engine committing against the given ledger, with the
    /// default lock configuration.
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            validator: ConflictValidator::new(Arc::clone(&ledger)),
            ledger,
            locks: ProductLockManager::new(),
            lock_config: LockConfig::default(),
        }
    }

    /// Sets the lock acquisition configuration for this engine.
    #[must_use]
    pub fn with_lock_config(mut self, config: LockConfig) -> Self {
        self.lock_config = config;
        self
    }

    /// The ledger this engine commits against.
    pub const fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// A validator over the same ledger, for advisory pre-flight checks
    /// (cart-level warnings) where staleness is acceptable.
    pub const fn validator(&self) -> &ConflictValidator<L> {
        &self.validator
    }

    /// Commits an order intent atomically.
    ///
    /// Acquires per-product leases in sorted order, re-validates under
    /// lock, then persists the order, its lines, and one `Sale` movement
    /// per line as a single write set. On conflict, returns
    /// [`CommitOutcome::Conflicted`] with the complete shortfall list and
    /// zero side effects.
    ///
    /// # Errors
    ///
    /// - [`CommitError::Busy`] — a product lease could not be acquired
    ///   within the retry budget; the whole attempt is safe to retry.
    /// - [`CommitError::NotFound`] — a line references a product with no
    ///   stock record.
    /// - [`CommitError::IntegrityViolation`] — a ledger invariant would
    ///   have broken during the write set. Unreachable when re-validation
    ///   is correct; checked defensively and logged for investigation.
    /// - [`CommitError::Ledger`] — the storage backend failed; the
    ///   attempt was rolled back in full.
    #[instrument(
        skip(self, intent),
        fields(customer = %intent.customer(), lines = intent.lines().len())
    )]
    pub async fn commit(&self, intent: OrderIntent) -> CommitResult<CommitOutcome> {
        let product_ids = intent.distinct_product_ids();

        debug!(products = product_ids.len(), phase = "locking", "acquiring product leases");
        let leases = self.locks.acquire_all(&product_ids, &self.lock_config).await?;

        debug!(phase = "validating", "re-validating under lock");
        let validation = self.validator.validate(intent.lines()).await?;
        if let Validation::Insufficient(report) = validation {
            info!(conflicts = report.len(), phase = "aborted", "commit rejected with conflicts");
            return Ok(CommitOutcome::Conflicted(report));
        }

        debug!(phase = "writing", "applying atomic write set");
        let order_id = OrderId::new();
        let (order, lines) = Order::from_intent(order_id, &intent, Timestamp::now());
        let movements = lines
            .iter()
            .map(|line| {
                NewMovement::new(
                    line.product_id.clone(),
                    MovementType::Sale,
                    QuantityDelta::sale_of(line.quantity),
                    "checkout sale".to_string(),
                    intent.placed_by().clone(),
                )
                .with_reference_order(order_id)
            })
            .collect();

        let committed = self
            .ledger
            .commit_order(order, lines, movements)
            .await
            .map_err(|err| {
                let err = CommitError::from(err);
                if let CommitError::IntegrityViolation { product_id, detail } = &err {
                    error!(
                        product_id = %product_id,
                        detail = %detail,
                        phase = "aborted",
                        "integrity violation during write set; attempt discarded"
                    );
                }
                err
            })?;

        info!(order_id = %committed.id, phase = "committed", "order committed");
        drop(leases);
        Ok(CommitOutcome::Committed(committed))
    }
}
