//! `StockCore` - inventory-aware order commit engine
//!
//! This library validates multi-line orders against live stock levels,
//! atomically applies stock decrements, and appends an immutable movement
//! ledger, guaranteeing that no two concurrent checkouts can oversell the
//! same product.
//!
//! Three components, leaves first:
//!
//! - [`ledger`] — the durable record of current/reserved/available
//!   quantities per product, plus an append-only log of every change.
//! - [`validator`] — a pure feasibility check of an order intent against
//!   current availability, reporting the complete shortfall list.
//! - [`engine`] — the atomic state machine that acquires per-product
//!   exclusive access in a deterministic order, re-validates, and either
//!   commits the whole write set or aborts it entirely.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod errors;
pub mod ledger;
pub mod locks;
pub mod order;
pub mod stock;
pub mod types;
pub mod validator;

pub use engine::{CommitOutcome, OrderCommitEngine};
pub use errors::{CommitError, CommitResult, LedgerError, LedgerResult};
pub use ledger::{MovementFilter, StockLedger};
pub use locks::{LockConfig, LockSet, ProductLockManager};
pub use order::{
    CustomerId, EmptyOrderIntent, FulfillmentType, LineRequest, Order, OrderIntent, OrderLine,
    PaymentMethod,
};
pub use stock::{Movement, MovementType, NewMovement, NewStockRecord, StockRecord};
pub use types::{
    ActorId, BatchId, MovementId, OrderId, ProductId, Quantity, QuantityDelta, Timestamp,
};
pub use validator::{ConflictReport, ConflictValidator, Shortfall, Validation};
