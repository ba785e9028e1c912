//! Core types for the `StockCore` inventory ledger.
//!
//! This module defines the fundamental identifier and quantity types used
//! throughout the library. All types use smart constructors to ensure
//! validity at construction time, following the "parse, don't validate"
//! principle.

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product identifier that keys a stock record.
///
/// `ProductId` values are guaranteed to be non-empty and at most 255
/// characters. The `Ord` implementation gives product ids a total order,
/// which the commit engine relies on for deterministic lock acquisition.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ProductId(String);

/// A globally unique movement identifier using UUIDv7 format.
///
/// `MovementId` values are guaranteed to be UUIDv7, which provides:
/// - Time-based ordering capability
/// - Globally unique identification
/// - Monotonic sort order for movements applied in sequence
///
/// Sorting movements by id therefore reproduces ledger application order.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct MovementId(Uuid);

impl MovementId {
    /// Creates a new `MovementId` with the current timestamp.
    pub fn new() -> Self {
        // This will always succeed as Uuid::now_v7() always returns a valid v7 UUID
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

/// A globally unique order identifier using UUIDv7 format.
///
/// Assigned by the commit engine when an order intent is persisted; sale
/// movements reference it so the audit trail can be joined back to the
/// order that caused each decrement.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new `OrderId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// An identifier grouping the movements of one bulk operation.
///
/// All movements applied by a single `apply_movement_batch` call share one
/// `BatchId`, so audit tooling can retrieve the whole operation.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Creates a new `BatchId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

/// The user or system actor that performed a movement.
///
/// Actor ids are validated to be non-empty and within reasonable length
/// limits. The engine performs no authorization; this is audit data only.
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
pub struct ActorId(String);

/// A requested order-line quantity.
///
/// Quantities are strictly positive; a zero-quantity line is
/// unrepresentable, which is how the engine enforces its input constraint.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Quantity(u32);

/// A signed quantity change carried by a movement.
///
/// Deltas are non-zero by construction; a movement that changes nothing is
/// not a movement.
#[nutype(
    validate(predicate = |delta: &i64| *delta != 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct QuantityDelta(i64);

impl QuantityDelta {
    /// The decrement corresponding to selling `quantity` units.
    pub fn sale_of(quantity: Quantity) -> Self {
        let units: u32 = quantity.into();
        Self::try_new(-i64::from(units)).expect("a positive quantity negated is never zero")
    }

    /// The increment corresponding to restocking `quantity` units.
    pub fn restock_of(quantity: Quantity) -> Self {
        let units: u32 = quantity.into();
        Self::try_new(i64::from(units)).expect("a positive quantity is never zero")
    }
}

/// A timestamp for when a movement was applied or an order committed.
///
/// This wrapper ensures consistent timestamp handling throughout the system
/// and enables future enhancements like custom serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl AsRef<DateTime<Utc>> for Timestamp {
    fn as_ref(&self) -> &DateTime<Utc> {
        self.as_datetime()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ProductId property tests
    proptest! {
        #[test]
        fn product_id_accepts_valid_strings(s in "[a-zA-Z0-9_-]{1,255}") {
            let result = ProductId::try_new(s.clone());
            prop_assert!(result.is_ok());
            let product_id = result.unwrap();
            prop_assert_eq!(product_id.as_ref(), &s);
        }

        #[test]
        fn product_id_trims_whitespace(s in " {0,10}[a-zA-Z0-9_-]{1,240} {0,10}") {
            let result = ProductId::try_new(s.clone());
            prop_assert!(result.is_ok());
            let product_id = result.unwrap();
            prop_assert_eq!(product_id.as_ref(), s.trim());
        }

        #[test]
        fn product_id_rejects_empty_strings(s in " {0,50}") {
            let result = ProductId::try_new(s);
            prop_assert!(result.is_err());
        }

        #[test]
        fn product_id_ordering_matches_string_ordering(
            a in "[a-z]{1,20}",
            b in "[a-z]{1,20}",
        ) {
            let id_a = ProductId::try_new(a.clone()).unwrap();
            let id_b = ProductId::try_new(b.clone()).unwrap();
            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        #[test]
        fn product_id_roundtrip_serialization(s in "[a-zA-Z0-9_-]{1,255}") {
            let product_id = ProductId::try_new(s).unwrap();
            let json = serde_json::to_string(&product_id).unwrap();
            let deserialized: ProductId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(product_id, deserialized);
        }
    }

    // Quantity and QuantityDelta property tests
    proptest! {
        #[test]
        fn quantity_accepts_positive_values(q in 1u32..=u32::MAX) {
            let result = Quantity::try_new(q);
            prop_assert!(result.is_ok());
            let value: u32 = result.unwrap().into();
            prop_assert_eq!(value, q);
        }

        #[test]
        fn quantity_delta_rejects_only_zero(d in any::<i64>()) {
            let result = QuantityDelta::try_new(d);
            prop_assert_eq!(result.is_ok(), d != 0);
        }

        #[test]
        fn sale_delta_negates_the_quantity(q in 1u32..=u32::MAX) {
            let quantity = Quantity::try_new(q).unwrap();
            let delta: i64 = QuantityDelta::sale_of(quantity).into();
            prop_assert_eq!(delta, -i64::from(q));
        }

        #[test]
        fn restock_delta_preserves_the_quantity(q in 1u32..=u32::MAX) {
            let quantity = Quantity::try_new(q).unwrap();
            let delta: i64 = QuantityDelta::restock_of(quantity).into();
            prop_assert_eq!(delta, i64::from(q));
        }
    }

    // Movement id ordering tests
    proptest! {
        #[test]
        fn movement_id_rejects_non_v7_uuids(uuid_bytes in any::<[u8; 16]>(), version in 0u8..=6u8) {
            let mut bytes = uuid_bytes;
            bytes[6] = (bytes[6] & 0x0F) | (version << 4);
            bytes[8] = (bytes[8] & 0x3F) | 0x80;

            let uuid = Uuid::from_bytes(bytes);
            let result = MovementId::try_new(uuid);
            prop_assert!(result.is_err());
        }

        #[test]
        fn movement_id_roundtrip_serialization(_: ()) {
            let movement_id = MovementId::new();
            let json = serde_json::to_string(&movement_id).unwrap();
            let deserialized: MovementId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(movement_id, deserialized);
        }
    }

    #[test]
    fn quantity_rejects_zero() {
        assert!(Quantity::try_new(0).is_err());
        assert!(Quantity::try_new(1).is_ok());
    }

    #[test]
    fn movement_id_new_creates_valid_v7() {
        let movement_id = MovementId::new();
        assert_eq!(
            movement_id.as_ref().get_version(),
            Some(uuid::Version::SortRand)
        );
    }

    #[test]
    fn movement_ids_created_in_sequence_sort_in_creation_order() {
        let first = MovementId::new();
        let second = MovementId::new();
        // UUIDv7 ids are time-ordered; within one process later ids compare greater
        assert!(first <= second);
    }

    #[test]
    fn order_and_batch_ids_reject_non_v7() {
        // Build a v4 UUID by hand; only the v7 feature is enabled
        let mut bytes = [0u8; 16];
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        let v4 = Uuid::from_bytes(bytes);

        assert!(OrderId::try_new(v4).is_err());
        assert!(BatchId::try_new(v4).is_err());
        assert!(OrderId::try_new(Uuid::nil()).is_err());
    }

    #[test]
    fn actor_id_rejects_specific_invalid_cases() {
        assert!(ActorId::try_new("").is_err());
        assert!(ActorId::try_new("   ").is_err());

        let long_string = "a".repeat(256);
        assert!(ActorId::try_new(long_string).is_err());

        let max_string = "a".repeat(255);
        assert!(ActorId::try_new(max_string).is_ok());
    }

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let timestamp = Timestamp::now();
        let after = Utc::now();

        assert!(timestamp.as_datetime() >= &before);
        assert!(timestamp.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_roundtrip_serialization() {
        let timestamp = Timestamp::now();
        let json = serde_json::to_string(&timestamp).unwrap();
        let deserialized: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(timestamp, deserialized);
    }
}
