//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls into the services
//! 3. Returns HTTP response (JSON, status code)
//!
//! Handlers carry no business rules; those live in the services and models.

/// Escrow hold/release/refund/status endpoints
pub mod escrow;
/// Inbound task-lifecycle event dispatch
pub mod events;
/// Health check endpoint
pub mod health;
/// Double-entry ledger endpoints
pub mod ledger;
/// Transaction query endpoints
pub mod transactions;
/// Wallet management endpoints
pub mod wallets;
