//! Pure feasibility checking of order intents against ledger state.
//!
//! The validator is side-effect free: it reads availability and reports
//! either "all satisfiable" or the complete shortfall list. It never
//! short-circuits, so one round trip gives the caller every conflicting
//! line. Standalone use is advisory (availability can change before
//! commit); the commit engine re-runs the same check while holding the
//! per-product locks, where its verdict is authoritative.

use crate::errors::LedgerResult;
use crate::ledger::StockLedger;
use crate::order::LineRequest;
use crate::types::ProductId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One line that cannot be satisfied from available stock.
///
/// Carries everything the caller needs to render a shortfall message
/// without a second query.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Shortfall {
    /// The conflicting product.
    pub product_id: ProductId,
    /// Display name from the stock record.
    pub product_name: String,
    /// Total units requested across the intent's lines for this product.
    pub requested: u64,
    /// Units actually available; zero for inactive products.
    pub available: i64,
}

/// The complete list of shortfalls for one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConflictReport {
    /// Every conflicting product, in product-id order.
    pub conflicts: Vec<Shortfall>,
}

impl ConflictReport {
    /// The number of conflicting products.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Whether the report is empty (it never is when returned).
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// The shortfall for a specific product, if it conflicted.
    pub fn for_product(&self, product_id: &ProductId) -> Option<&Shortfall> {
        self.conflicts.iter().find(|c| &c.product_id == product_id)
    }
}

/// The outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Every line can be satisfied from available stock.
    Satisfiable,
    /// One or more lines cannot; the report lists all of them.
    Insufficient(ConflictReport),
}

/// Checks order intents against current ledger availability.
#[derive(Debug, Clone)]
pub struct ConflictValidator<L> {
    ledger: Arc<L>,
}

impl<L> ConflictValidator<L>
where
    L: StockLedger,
{
    /// Creates a validator reading from the given ledger.
    pub const fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Validates a set of line requests against current availability.
    ///
    /// Lines naming the same product are aggregated first, so the combined
    /// requested quantity is what gets checked. Every product is checked —
    /// no short-circuit on the first conflict. An inactive product is a
    /// conflict with `available = 0`; a product with no stock record at
    /// all is a `NotFound` error, not a conflict.
    pub async fn validate(&self, lines: &[LineRequest]) -> LedgerResult<Validation> {
        let mut requested_by_product: BTreeMap<ProductId, u64> = BTreeMap::new();
        for line in lines {
            let units: u32 = line.quantity.into();
            *requested_by_product
                .entry(line.product_id.clone())
                .or_insert(0) += u64::from(units);
        }

        let mut conflicts = Vec::new();
        for (product_id, requested) in requested_by_product {
            let record = self.ledger.get_record(&product_id).await?;

            let available = if record.is_active { record.available() } else { 0 };
            let satisfiable = available >= 0 && requested <= available.unsigned_abs();
            if !satisfiable {
                debug!(
                    product_id = %product_id,
                    requested,
                    available,
                    "line cannot be satisfied"
                );
                conflicts.push(Shortfall {
                    product_id,
                    product_name: record.product_name,
                    requested,
                    available,
                });
            }
        }

        if conflicts.is_empty() {
            Ok(Validation::Satisfiable)
        } else {
            Ok(Validation::Insufficient(ConflictReport { conflicts }))
        }
    }
}
