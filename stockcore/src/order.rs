//! Order intents and the persisted order model.
//!
//! An [`OrderIntent`] is the transient, caller-supplied checkout request.
//! It becomes a persisted [`Order`] plus [`OrderLine`] set only when the
//! commit engine succeeds; an aborted commit leaves no order rows at all.

use crate::types::{ActorId, OrderId, ProductId, Quantity, Timestamp};
use nutype::nutype;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The customer an order is placed for.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct CustomerId(String);

/// How the order will be handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    /// Collected by the customer.
    Pickup,
    /// Shipped or couriered out.
    Delivery,
}

/// How the order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at handover.
    Cash,
    /// Card payment.
    Card,
    /// Bank transfer against invoice.
    BankTransfer,
}

/// One requested line of an order intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// The product to order.
    pub product_id: ProductId,
    /// Requested units; strictly positive by construction.
    pub quantity: Quantity,
    /// Unit price agreed at request time.
    pub unit_price: Decimal,
}

impl LineRequest {
    /// Creates a line request.
    pub const fn new(product_id: ProductId, quantity: Quantity, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }

    /// The line's extended price: `quantity * unit_price`.
    pub fn line_total(&self) -> Decimal {
        let units: u32 = self.quantity.into();
        Decimal::from(units) * self.unit_price
    }
}

/// Error returned when an order intent is constructed with no lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an order intent must contain at least one line")]
pub struct EmptyOrderIntent;

/// A caller-supplied, not-yet-committed checkout request.
///
/// Intents are valid by construction: the line list is non-empty and every
/// quantity is positive (unrepresentable otherwise via [`Quantity`]).
/// Nothing about an intent is persisted; only a successful commit produces
/// durable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    customer: CustomerId,
    placed_by: ActorId,
    fulfillment_type: FulfillmentType,
    payment_method: PaymentMethod,
    lines: Vec<LineRequest>,
}

impl OrderIntent {
    /// Creates an order intent, rejecting an empty line list.
    pub fn try_new(
        customer: CustomerId,
        placed_by: ActorId,
        fulfillment_type: FulfillmentType,
        payment_method: PaymentMethod,
        lines: Vec<LineRequest>,
    ) -> Result<Self, EmptyOrderIntent> {
        if lines.is_empty() {
            return Err(EmptyOrderIntent);
        }
        Ok(Self {
            customer,
            placed_by,
            fulfillment_type,
            payment_method,
            lines,
        })
    }

    /// The customer the order is for.
    pub const fn customer(&self) -> &CustomerId {
        &self.customer
    }

    /// The actor submitting the checkout; recorded on sale movements.
    pub const fn placed_by(&self) -> &ActorId {
        &self.placed_by
    }

    /// The requested lines.
    pub fn lines(&self) -> &[LineRequest] {
        &self.lines
    }

    /// The distinct product ids referenced by this intent, sorted.
    ///
    /// Sorted order is the lock-acquisition order: every commit acquires
    /// per-product access in this same total order, which is what makes
    /// concurrent commits over overlapping product sets deadlock-free.
    pub fn distinct_product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|l| l.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// The intent's total price across all lines.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(LineRequest::line_total).sum()
    }
}

/// A persisted order, created only by a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier assigned at commit time.
    pub id: OrderId,
    /// The customer the order is for.
    pub customer: CustomerId,
    /// The actor that submitted the checkout.
    pub placed_by: ActorId,
    /// How the order is handed over.
    pub fulfillment_type: FulfillmentType,
    /// How the order is paid.
    pub payment_method: PaymentMethod,
    /// Total price across all lines.
    pub total: Decimal,
    /// When the commit succeeded.
    pub placed_at: Timestamp,
}

/// One persisted line of a committed order.
///
/// Lines are created together with their order and are immutable after
/// commit. Each line corresponds to exactly one `Sale` movement carrying
/// the order's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The order this line belongs to.
    pub order_id: OrderId,
    /// The product sold.
    pub product_id: ProductId,
    /// Units sold.
    pub quantity: Quantity,
    /// Unit price at commit time.
    pub unit_price: Decimal,
    /// Extended price for the line.
    pub line_total: Decimal,
}

impl Order {
    /// Materializes the order and its lines from an intent.
    ///
    /// Pure construction; nothing is persisted here. The commit engine
    /// hands the result to the ledger as part of the atomic write set.
    pub fn from_intent(id: OrderId, intent: &OrderIntent, at: Timestamp) -> (Self, Vec<OrderLine>) {
        let lines = intent
            .lines()
            .iter()
            .map(|line| OrderLine {
                order_id: id,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total(),
            })
            .collect();

        let order = Self {
            id,
            customer: intent.customer().clone(),
            placed_by: intent.placed_by().clone(),
            fulfillment_type: intent.fulfillment_type,
            payment_method: intent.payment_method,
            total: intent.total(),
            placed_at: at,
        };

        (order, lines)
    }
}
