//! Escrow and ledger wallet service for task payments.
//!
//! The core is the escrow subsystem: money moves between wallets through a
//! two-phase hold/release protocol backed by per-wallet serialized balance
//! mutations, an append-only transaction audit trail, and a double-entry
//! ledger facility. The HTTP layer in [`handlers`] is thin glue over the
//! [`services`].

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::db::DbPool;
use crate::services::escrow_service::EscrowConfig;
use crate::services::{EscrowService, LedgerService, TransactionService, WalletService};
use crate::store::postgres::{
    PostgresLedgerStore, PostgresTransactionStore, PostgresWalletStore,
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub wallets: WalletService,
    pub transactions: TransactionService,
    pub ledger: LedgerService,
    pub escrow: EscrowService,
}

impl AppState {
    /// Wire the services onto the Postgres stores.
    pub fn new(pool: DbPool, escrow_config: EscrowConfig) -> Self {
        let wallets = WalletService::new(Arc::new(PostgresWalletStore::new(pool.clone())));
        let transactions =
            TransactionService::new(Arc::new(PostgresTransactionStore::new(pool.clone())));
        let ledger = LedgerService::new(Arc::new(PostgresLedgerStore::new(pool.clone())));
        let escrow = EscrowService::new(wallets.clone(), transactions.clone(), escrow_config);
        Self {
            pool,
            wallets,
            transactions,
            ledger,
            escrow,
        }
    }
}
