//! Integration tests for `StockCore`
//!
//! This crate contains integration tests that verify the interaction
//! between the core engine and the in-memory ledger backend.

// This is a test-only crate
#![cfg(test)]
