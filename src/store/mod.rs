//! Persistence boundary.
//!
//! The services talk to storage through these traits. The production
//! adapters live in [`postgres`]; [`memory`] provides in-process adapters
//! with the same contracts for tests and local drills.
//!
//! # Contracts the adapters must honor
//!
//! - `WalletStore::with_wallet` is the wallet-granularity serialization
//!   point: the read-modify-write runs as one durable unit and two
//!   concurrent calls against the same wallet never interleave.
//! - Unique-key violations (one wallet per user, globally unique
//!   transaction reference) surface as `Validation` errors, not raw
//!   database errors.
//! - Listing and task lookups order by creation time, newest first.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ledger::{AccountType, LedgerEntry};
use crate::models::transaction::{Transaction, TransactionFilter};
use crate::models::wallet::Wallet;

pub mod memory;
pub mod postgres;

/// A fallible mutation applied to a wallet inside its consistency boundary.
pub type WalletMutation = Box<dyn FnOnce(&mut Wallet) -> Result<(), AppError> + Send>;

/// Storage for wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Persist a new wallet.
    ///
    /// # Errors
    ///
    /// `Validation` if a wallet already exists for the user.
    async fn insert(&self, wallet: Wallet) -> Result<Wallet, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, AppError>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Wallet>, AppError>;

    /// Atomically read, mutate and persist one wallet.
    ///
    /// The wallet is loaded under the record's lock, `mutation` is applied
    /// to the domain value, and the result is written back and committed as
    /// a single durable unit. If `mutation` fails nothing is persisted and
    /// its error is returned unchanged.
    ///
    /// # Errors
    ///
    /// `WalletNotFound` if no wallet exists for `id`.
    async fn with_wallet(&self, id: Uuid, mutation: WalletMutation) -> Result<Wallet, AppError>;
}

/// Storage for transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction.
    ///
    /// # Errors
    ///
    /// `Validation` if the reference already exists.
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, AppError>;

    async fn find_by_reference(&self, reference: &str)
    -> Result<Option<Transaction>, AppError>;

    /// Persist the mutable fields (status, gateway reference, metadata) of
    /// an existing transaction.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` if the record no longer exists.
    async fn update(&self, transaction: &Transaction) -> Result<Transaction, AppError>;

    /// One page of matching transactions (newest first) plus the total
    /// match count across all pages.
    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError>;

    /// Newest payment-kind transaction whose metadata `task_id` matches.
    async fn find_latest_for_task(&self, task_id: &str)
    -> Result<Option<Transaction>, AppError>;
}

/// Storage for ledger entries. Write-once: there is no update or delete.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, AppError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AppError>;

    /// `(debit_sum, credit_sum)` over all entries of one transaction.
    async fn sums_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<(Decimal, Decimal), AppError>;

    /// `(debit_sum, credit_sum)` over all entries of one account type.
    async fn sums_for_account(
        &self,
        account_type: AccountType,
    ) -> Result<(Decimal, Decimal), AppError>;
}
