//! Data models representing database entities.
//!
//! This module contains the domain entities and the invariant-enforcing
//! methods on them. Services orchestrate persistence; the rules about what
//! a wallet, transaction or ledger entry may do live here.

/// Double-entry ledger records
pub mod ledger;
/// Monetary amount validation and rounding
pub mod money;
/// Transaction record and state machine
pub mod transaction;
/// Wallet entity and balance mutations
pub mod wallet;
