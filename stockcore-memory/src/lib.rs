//! In-memory backend for the `StockCore` inventory ledger
//!
//! This crate provides an in-memory implementation of the `StockLedger`
//! trait from the stockcore crate, useful for testing and development
//! scenarios where persistence is not required. Despite being in-memory it
//! honors the full atomicity contract: every multi-entity write set is
//! validated against staged successor state before any table is touched,
//! so partial application is unrepresentable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use stockcore::errors::{LedgerError, LedgerResult};
use stockcore::ledger::{MovementFilter, StockLedger};
use stockcore::order::{Order, OrderLine};
use stockcore::stock::{Movement, NewMovement, NewStockRecord, StockRecord};
use stockcore::types::{BatchId, MovementId, OrderId, ProductId, Timestamp};

/// Thread-safe in-memory stock ledger.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    // Maps product ids to their authoritative stock record
    records: Arc<RwLock<HashMap<ProductId, StockRecord>>>,
    // Append-only movement log, in application order
    movements: Arc<RwLock<Vec<Movement>>>,
    // Committed orders with their lines
    orders: Arc<RwLock<HashMap<OrderId, (Order, Vec<OrderLine>)>>>,
}

impl InMemoryStockLedger {
    /// Create a new empty in-memory ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the successor records and movement rows for a write set
    /// without touching any table.
    ///
    /// Entries targeting the same product compound: each is validated
    /// against the staged state left by the previous one. Returns the
    /// staged records and movements for the caller to apply, or the first
    /// failure with nothing staged.
    fn stage(
        records: &HashMap<ProductId, StockRecord>,
        entries: &[NewMovement],
        batch_id: Option<BatchId>,
    ) -> LedgerResult<(HashMap<ProductId, StockRecord>, Vec<Movement>)> {
        let mut staged: HashMap<ProductId, StockRecord> = HashMap::new();
        let mut applied = Vec::with_capacity(entries.len());

        for entry in entries {
            let current = match staged.get(&entry.product_id) {
                Some(record) => record.clone(),
                None => records
                    .get(&entry.product_id)
                    .cloned()
                    .ok_or_else(|| LedgerError::NotFound(entry.product_id.clone()))?,
            };

            let entry = match batch_id {
                Some(batch_id) => entry.clone().with_batch(batch_id),
                None => entry.clone(),
            };
            let (updated, movement) = current.apply(&entry, MovementId::new(), Timestamp::now())?;

            // The construction path guarantees this; re-check before the
            // movement can reach the log
            if !movement.is_consistent() {
                return Err(LedgerError::IntegrityViolation {
                    product_id: movement.product_id.clone(),
                    detail: format!(
                        "movement arithmetic {} + {} != {}",
                        movement.previous_stock, movement.quantity_change, movement.new_stock
                    ),
                });
            }

            staged.insert(updated.product_id.clone(), updated);
            applied.push(movement);
        }

        Ok((staged, applied))
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn create_record(&self, new: NewStockRecord) -> LedgerResult<StockRecord> {
        let mut records = self.records.write().expect("RwLock poisoned");

        if records.contains_key(&new.product_id) {
            return Err(LedgerError::AlreadyExists(new.product_id));
        }

        let record = StockRecord::onboard(new, Timestamp::now());
        records.insert(record.product_id.clone(), record.clone());
        Ok(record)
    }

    async fn get_record(&self, product_id: &ProductId) -> LedgerResult<StockRecord> {
        let records = self.records.read().expect("RwLock poisoned");

        records
            .get(product_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(product_id.clone()))
    }

    async fn get_available(&self, product_id: &ProductId) -> LedgerResult<i64> {
        let records = self.records.read().expect("RwLock poisoned");

        let record = records
            .get(product_id)
            .ok_or_else(|| LedgerError::NotFound(product_id.clone()))?;
        if !record.is_active {
            return Err(LedgerError::Inactive(product_id.clone()));
        }
        Ok(record.available())
    }

    async fn apply_movement(&self, movement: NewMovement) -> LedgerResult<Movement> {
        let mut records = self.records.write().expect("RwLock poisoned");
        let mut movements = self.movements.write().expect("RwLock poisoned");

        let (staged, mut applied) = Self::stage(&records, std::slice::from_ref(&movement), None)?;

        records.extend(staged);
        let movement = applied.pop().expect("one entry stages one movement");
        movements.push(movement.clone());
        Ok(movement)
    }

    async fn apply_movement_batch(
        &self,
        entries: Vec<NewMovement>,
        batch_id: BatchId,
    ) -> LedgerResult<Vec<Movement>> {
        let mut records = self.records.write().expect("RwLock poisoned");
        let mut movements = self.movements.write().expect("RwLock poisoned");

        // Verify the whole batch before any table changes; a failing
        // entry discards the batch
        let (staged, applied) = Self::stage(&records, &entries, Some(batch_id))?;

        records.extend(staged);
        movements.extend(applied.iter().cloned());
        Ok(applied)
    }

    async fn commit_order(
        &self,
        order: Order,
        lines: Vec<OrderLine>,
        new_movements: Vec<NewMovement>,
    ) -> LedgerResult<Order> {
        let mut records = self.records.write().expect("RwLock poisoned");
        let mut movements = self.movements.write().expect("RwLock poisoned");
        let mut orders = self.orders.write().expect("RwLock poisoned");

        if orders.contains_key(&order.id) {
            return Err(LedgerError::Storage(format!(
                "order id collision on '{}'",
                order.id
            )));
        }

        let (staged, applied) = Self::stage(&records, &new_movements, None)?;

        records.extend(staged);
        movements.extend(applied);
        orders.insert(order.id, (order.clone(), lines));
        Ok(order)
    }

    async fn get_order(&self, order_id: &OrderId) -> LedgerResult<(Order, Vec<OrderLine>)> {
        let orders = self.orders.read().expect("RwLock poisoned");

        orders
            .get(order_id)
            .cloned()
            .ok_or(LedgerError::OrderNotFound(*order_id))
    }

    async fn movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<Movement>> {
        let movements = self.movements.read().expect("RwLock poisoned");

        let mut matching: Vec<Movement> = movements
            .iter()
            .filter(|movement| filter.matches(movement))
            .cloned()
            .collect();

        // Movement ids are UUIDv7, so id order is application order
        matching.sort_by_key(|movement| movement.id);
        Ok(matching)
    }

    async fn set_active(&self, product_id: &ProductId, active: bool) -> LedgerResult<StockRecord> {
        let mut records = self.records.write().expect("RwLock poisoned");

        let record = records
            .get_mut(product_id)
            .ok_or_else(|| LedgerError::NotFound(product_id.clone()))?;
        record.is_active = active;
        record.last_updated = Timestamp::now();
        Ok(record.clone())
    }

    async fn records_below_minimum(&self) -> LedgerResult<Vec<StockRecord>> {
        let records = self.records.read().expect("RwLock poisoned");

        let mut low: Vec<StockRecord> = records
            .values()
            .filter(|record| record.is_active && record.is_below_minimum())
            .cloned()
            .collect();
        low.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(low)
    }
}
