//! Stock ledger abstraction.
//!
//! This module defines the core [`StockLedger`] trait that serves as the
//! port interface for different storage backends. The trait is designed to
//! be backend-independent and to support multi-entity atomic write sets:
//! the commit engine's order write and the bulk movement batch both
//! succeed completely or fail completely.

use crate::errors::LedgerResult;
use crate::order::{Order, OrderLine};
use crate::stock::{Movement, MovementType, NewMovement, NewStockRecord, StockRecord};
use crate::types::{BatchId, OrderId, ProductId};
use async_trait::async_trait;

/// Criteria for querying the movement log.
///
/// All fields are conjunctive: a movement matches when every set field
/// matches. Audit tooling reads the log through this filter and never
/// writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    /// Only movements for this product.
    pub product_id: Option<ProductId>,
    /// Only movements of this type.
    pub movement_type: Option<MovementType>,
    /// Only movements caused by this order.
    pub reference_order_id: Option<OrderId>,
    /// Only movements belonging to this bulk operation.
    pub batch_id: Option<BatchId>,
}

impl MovementFilter {
    /// Creates an empty filter matching every movement.
    pub const fn new() -> Self {
        Self {
            product_id: None,
            movement_type: None,
            reference_order_id: None,
            batch_id: None,
        }
    }

    /// Restricts the filter to one product.
    #[must_use]
    pub fn for_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Restricts the filter to one movement type.
    #[must_use]
    pub const fn of_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    /// Restricts the filter to movements caused by one order.
    #[must_use]
    pub const fn for_order(mut self, order_id: OrderId) -> Self {
        self.reference_order_id = Some(order_id);
        self
    }

    /// Restricts the filter to one bulk operation.
    #[must_use]
    pub const fn for_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Whether a movement satisfies every set criterion.
    pub fn matches(&self, movement: &Movement) -> bool {
        self.product_id
            .as_ref()
            .map_or(true, |id| &movement.product_id == id)
            && self
                .movement_type
                .map_or(true, |t| movement.movement_type == t)
            && self
                .reference_order_id
                .map_or(true, |id| movement.reference_order_id == Some(id))
            && self
                .batch_id
                .map_or(true, |id| movement.batch_id == Some(id))
    }
}

/// The core stock ledger trait that all backends must satisfy.
///
/// The ledger holds authoritative quantities and the immutable history of
/// how they were reached. All mutation is funneled through movements; no
/// direct field update is ever exposed, and no caller holds a raw mutable
/// reference to a [`StockRecord`].
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Onboards a product, creating its stock record at zero stock.
    ///
    /// # Errors
    /// Returns `LedgerError::AlreadyExists` if the product already has a
    /// record (including a deactivated one).
    async fn create_record(&self, new: NewStockRecord) -> LedgerResult<StockRecord>;

    /// Reads a product's stock record, active or not.
    ///
    /// # Errors
    /// Returns `LedgerError::NotFound` if the product was never onboarded.
    async fn get_record(&self, product_id: &ProductId) -> LedgerResult<StockRecord>;

    /// Reads a product's available quantity
    /// (`current_stock - reserved_stock`).
    ///
    /// # Errors
    /// Returns `LedgerError::NotFound` if the product has no record and
    /// `LedgerError::Inactive` if the record is soft-deactivated.
    async fn get_available(&self, product_id: &ProductId) -> LedgerResult<i64>;

    /// Applies a single movement: derives the successor record, persists
    /// the updated record and the movement as one unit.
    ///
    /// This is the only way stock values change.
    ///
    /// # Errors
    /// Returns `LedgerError::IntegrityViolation` if the movement would
    /// make `current_stock < 0` or `reserved_stock > current_stock`;
    /// nothing is persisted in that case.
    async fn apply_movement(&self, movement: NewMovement) -> LedgerResult<Movement>;

    /// Applies a batch of movements as one unit, all sharing `batch_id`.
    ///
    /// Validation runs for every entry before anything is persisted; if
    /// any entry fails, **none** of the batch's movements are applied.
    /// Entries targeting the same product compound: each is validated
    /// against the state left by the previous one.
    ///
    /// # Errors
    /// As [`apply_movement`](Self::apply_movement), for the first failing
    /// entry.
    async fn apply_movement_batch(
        &self,
        entries: Vec<NewMovement>,
        batch_id: BatchId,
    ) -> LedgerResult<Vec<Movement>>;

    /// Persists a committed order as one atomic write set: the order, its
    /// lines, the sale movements, and the updated stock records all become
    /// durable together or not at all.
    ///
    /// The commit engine is the only intended caller; it supplies one
    /// `Sale` movement per line carrying the order's id.
    ///
    /// # Errors
    /// Returns `LedgerError::IntegrityViolation` if any movement fails its
    /// invariant check; the entire write set is discarded.
    async fn commit_order(
        &self,
        order: Order,
        lines: Vec<OrderLine>,
        movements: Vec<NewMovement>,
    ) -> LedgerResult<Order>;

    /// Reads back a committed order and its lines.
    ///
    /// # Errors
    /// Returns `LedgerError::OrderNotFound` if the order does not exist.
    async fn get_order(&self, order_id: &OrderId) -> LedgerResult<(Order, Vec<OrderLine>)>;

    /// Queries the movement log, read-only, in ledger application order.
    async fn movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<Movement>>;

    /// Soft-(de)activates a product's record.
    ///
    /// Deactivated records keep their history and counters but report as
    /// unavailable; they are never deleted while movements reference them.
    ///
    /// # Errors
    /// Returns `LedgerError::NotFound` if the product was never onboarded.
    async fn set_active(&self, product_id: &ProductId, active: bool) -> LedgerResult<StockRecord>;

    /// Active records whose available quantity is at or below their
    /// minimum threshold, for restock tooling.
    async fn records_below_minimum(&self) -> LedgerResult<Vec<StockRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActorId, MovementId, QuantityDelta, Timestamp};

    fn sample_movement(product: &str, movement_type: MovementType) -> Movement {
        let new = NewMovement::new(
            ProductId::try_new(product).unwrap(),
            movement_type,
            QuantityDelta::try_new(5).unwrap(),
            "test".to_string(),
            ActorId::try_new("tester").unwrap(),
        );
        Movement {
            id: MovementId::new(),
            product_id: new.product_id,
            movement_type: new.movement_type,
            quantity_change: new.quantity_change,
            previous_stock: 0,
            new_stock: 5,
            reason: new.reason,
            performed_by: new.performed_by,
            performed_at: Timestamp::now(),
            reference_order_id: None,
            batch_id: None,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = MovementFilter::new();
        assert!(filter.matches(&sample_movement("a", MovementType::Restock)));
        assert!(filter.matches(&sample_movement("b", MovementType::Adjustment)));
    }

    #[test]
    fn filter_criteria_are_conjunctive() {
        let filter = MovementFilter::new()
            .for_product(ProductId::try_new("a").unwrap())
            .of_type(MovementType::Restock);

        assert!(filter.matches(&sample_movement("a", MovementType::Restock)));
        assert!(!filter.matches(&sample_movement("a", MovementType::Adjustment)));
        assert!(!filter.matches(&sample_movement("b", MovementType::Restock)));
    }

    #[test]
    fn order_filter_rejects_unreferenced_movements() {
        let filter = MovementFilter::new().for_order(OrderId::new());
        assert!(!filter.matches(&sample_movement("a", MovementType::Sale)));
    }

    #[test]
    fn batch_filter_matches_tagged_movements() {
        let batch_id = BatchId::new();
        let mut movement = sample_movement("a", MovementType::Restock);
        movement.batch_id = Some(batch_id);

        assert!(MovementFilter::new().for_batch(batch_id).matches(&movement));
        assert!(!MovementFilter::new()
            .for_batch(BatchId::new())
            .matches(&movement));
    }
}
