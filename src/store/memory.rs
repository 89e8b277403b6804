//! In-memory store adapters.
//!
//! Same contracts as the Postgres adapters, backed by `tokio::sync::Mutex`
//! maps. The mutex plays the role of the row lock: wallet mutations
//! serialize on it, so two concurrent mutations of the same wallet can
//! never both read the same pre-mutation balance. Used by the integration
//! tests and local drills; never by the server binary.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ledger::{AccountType, LedgerEntry};
use crate::models::transaction::{
    Transaction, TransactionFilter, TransactionKind, meta,
};
use crate::models::wallet::Wallet;
use crate::store::{LedgerStore, TransactionStore, WalletMutation, WalletStore};

/// In-memory wallet store.
#[derive(Clone, Default)]
pub struct MemoryWalletStore {
    wallets: Arc<Mutex<HashMap<Uuid, Wallet>>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn insert(&self, wallet: Wallet) -> Result<Wallet, AppError> {
        let mut wallets = self.wallets.lock().await;
        if wallets.values().any(|w| w.user_id == wallet.user_id) {
            return Err(AppError::Validation(
                "A wallet already exists for this user".to_string(),
            ));
        }
        wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, AppError> {
        Ok(self.wallets.lock().await.get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Wallet>, AppError> {
        Ok(self
            .wallets
            .lock()
            .await
            .values()
            .find(|w| w.user_id == user_id)
            .cloned())
    }

    async fn with_wallet(&self, id: Uuid, mutation: WalletMutation) -> Result<Wallet, AppError> {
        // Holding the map lock for the whole read-modify-write serializes
        // concurrent mutations, same as the row lock in Postgres.
        let mut wallets = self.wallets.lock().await;
        let wallet = wallets.get_mut(&id).ok_or(AppError::WalletNotFound)?;
        let mut staged = wallet.clone();
        mutation(&mut staged)?;
        staged.updated_at = Utc::now();
        *wallet = staged.clone();
        Ok(staged)
    }
}

/// In-memory transaction store. Insertion order doubles as creation order.
#[derive(Clone, Default)]
pub struct MemoryTransactionStore {
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(tx: &Transaction, filter: &TransactionFilter) -> bool {
    filter.wallet_id.is_none_or(|id| tx.wallet_id == id)
        && filter.kind.is_none_or(|kind| tx.kind == kind)
        && filter.status.is_none_or(|status| tx.status == status)
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, AppError> {
        let mut transactions = self.transactions.lock().await;
        if transactions
            .iter()
            .any(|t| t.reference == transaction.reference)
        {
            return Err(AppError::Validation(
                "Transaction reference already exists".to_string(),
            ));
        }
        transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        Ok(self
            .transactions
            .lock()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, AppError> {
        Ok(self
            .transactions
            .lock()
            .await
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn update(&self, transaction: &Transaction) -> Result<Transaction, AppError> {
        let mut transactions = self.transactions.lock().await;
        let slot = transactions
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or(AppError::TransactionNotFound)?;
        *slot = transaction.clone();
        Ok(transaction.clone())
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError> {
        let transactions = self.transactions.lock().await;
        let matching: Vec<&Transaction> = transactions
            .iter()
            .rev()
            .filter(|t| matches_filter(t, filter))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn find_latest_for_task(
        &self,
        task_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        Ok(self
            .transactions
            .lock()
            .await
            .iter()
            .rev()
            .find(|t| {
                t.kind == TransactionKind::Payment && t.metadata_str(meta::TASK_ID) == Some(task_id)
            })
            .cloned())
    }
}

/// In-memory ledger store.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, AppError> {
        self.entries.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| e.transaction_id() == transaction_id)
            .cloned()
            .collect())
    }

    async fn sums_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<(Decimal, Decimal), AppError> {
        let entries = self.entries.lock().await;
        let sums = entries
            .iter()
            .filter(|e| e.transaction_id() == transaction_id)
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), e| {
                (d + e.debit_amount(), c + e.credit_amount())
            });
        Ok(sums)
    }

    async fn sums_for_account(
        &self,
        account_type: AccountType,
    ) -> Result<(Decimal, Decimal), AppError> {
        let entries = self.entries.lock().await;
        let sums = entries
            .iter()
            .filter(|e| e.account_type() == account_type)
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), e| {
                (d + e.debit_amount(), c + e.credit_amount())
            });
        Ok(sums)
    }
}
