//! Transaction service - record creation, status transitions and querying.
//!
//! Status transitions load the current record, run the state machine on the
//! model, and persist the result; an invalid source state surfaces as
//! `StateConflict` before anything is written.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::transaction::{
    NewTransaction, Transaction, TransactionFilter, TransactionPage,
};
use crate::store::TransactionStore;

/// Largest page size `list_transactions` will serve.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Orchestrates transaction persistence. Cheap to clone.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn TransactionStore>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Create a pending transaction, generating a reference when the caller
    /// did not supply one.
    ///
    /// The reference is checked for collisions before insert; the store's
    /// unique constraint backs the check up under concurrency.
    ///
    /// # Errors
    ///
    /// `Validation` on a non-positive amount or a duplicate reference.
    pub async fn create_transaction(
        &self,
        input: NewTransaction,
    ) -> Result<Transaction, AppError> {
        let transaction = Transaction::new(input)?;

        if self
            .store
            .find_by_reference(&transaction.reference)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(format!(
                "Transaction reference {} already exists",
                transaction.reference
            )));
        }

        let transaction = self.store.insert(transaction).await?;
        tracing::info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "transaction created"
        );
        Ok(transaction)
    }

    /// Look up a transaction by id. `None` if absent.
    pub async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        self.store.find_by_id(id).await
    }

    async fn load(&self, id: Uuid) -> Result<Transaction, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AppError::TransactionNotFound)
    }

    /// Move a pending transaction into processing.
    pub async fn mark_as_processing(&self, id: Uuid) -> Result<Transaction, AppError> {
        let mut transaction = self.load(id).await?;
        transaction.mark_as_processing()?;
        self.store.update(&transaction).await
    }

    /// Complete a pending or processing transaction, optionally recording
    /// the gateway's identifier.
    pub async fn mark_as_completed(
        &self,
        id: Uuid,
        gateway_reference: Option<String>,
    ) -> Result<Transaction, AppError> {
        let mut transaction = self.load(id).await?;
        transaction.mark_as_completed(gateway_reference)?;
        self.store.update(&transaction).await
    }

    /// Fail a transaction, recording the error message in its metadata.
    /// Allowed from every status except completed.
    pub async fn mark_as_failed(
        &self,
        id: Uuid,
        error_message: Option<String>,
    ) -> Result<Transaction, AppError> {
        let mut transaction = self.load(id).await?;
        transaction.mark_as_failed(error_message)?;
        self.store.update(&transaction).await
    }

    /// Cancel a pending transaction.
    pub async fn cancel(&self, id: Uuid) -> Result<Transaction, AppError> {
        let mut transaction = self.load(id).await?;
        transaction.cancel()?;
        self.store.update(&transaction).await
    }

    /// List transactions newest-first, one page at a time.
    ///
    /// Pagination parameters are clamped rather than rejected: `page` to at
    /// least 1, `page_size` into `[1, 100]`.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: i64,
        page_size: i64,
    ) -> Result<TransactionPage, AppError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * page_size;

        let (transactions, total) = self.store.list(&filter, page_size, offset).await?;
        let total_pages = (total + page_size - 1) / page_size;

        Ok(TransactionPage {
            transactions,
            total,
            page,
            page_size,
            total_pages,
        })
    }

    /// Newest payment-kind transaction recorded for a task, if any.
    pub async fn find_latest_for_task(
        &self,
        task_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        self.store.find_latest_for_task(task_id).await
    }
}
