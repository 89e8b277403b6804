//! Ledger service - double-entry bookkeeping over ledger entries.
//!
//! Entries are written once and only in matched pairs for real financial
//! events; `verify_double_entry_balance` is the fundamental correctness
//! check. The ledger is an independent, composable facility: nothing else
//! in the system depends on it, and it mutates no wallet state.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ledger::{AccountType, LedgerEntry};
use crate::store::LedgerStore;

/// Orchestrates ledger persistence. Cheap to clone.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Record a single debit entry.
    ///
    /// # Errors
    ///
    /// `Validation` if the amount is not strictly positive.
    pub async fn create_debit_entry(
        &self,
        transaction_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        balance_after: Decimal,
        description: Option<String>,
    ) -> Result<LedgerEntry, AppError> {
        let entry =
            LedgerEntry::debit(transaction_id, account_type, amount, balance_after, description)?;
        self.store.insert(entry).await
    }

    /// Record a single credit entry.
    ///
    /// # Errors
    ///
    /// `Validation` if the amount is not strictly positive.
    pub async fn create_credit_entry(
        &self,
        transaction_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        balance_after: Decimal,
        description: Option<String>,
    ) -> Result<LedgerEntry, AppError> {
        let entry =
            LedgerEntry::credit(transaction_id, account_type, amount, balance_after, description)?;
        self.store.insert(entry).await
    }

    /// Record a balanced debit/credit pair for one financial event.
    ///
    /// Both entries carry the same transaction id and the same amount; this
    /// is the unit of double-entry bookkeeping.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_double_entry(
        &self,
        transaction_id: Uuid,
        debit_account: AccountType,
        credit_account: AccountType,
        amount: Decimal,
        debit_balance_after: Decimal,
        credit_balance_after: Decimal,
        description: Option<String>,
    ) -> Result<(LedgerEntry, LedgerEntry), AppError> {
        let debit = self
            .create_debit_entry(
                transaction_id,
                debit_account,
                amount,
                debit_balance_after,
                description.clone(),
            )
            .await?;
        let credit = self
            .create_credit_entry(
                transaction_id,
                credit_account,
                amount,
                credit_balance_after,
                description,
            )
            .await?;
        tracing::info!(
            %transaction_id,
            %amount,
            debit_account = %debit_account,
            credit_account = %credit_account,
            "double entry recorded"
        );
        Ok((debit, credit))
    }

    /// All entries recorded against a transaction.
    pub async fn entries_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        self.store.find_by_transaction_id(transaction_id).await
    }

    /// True iff the debit and credit sums for a transaction are exactly
    /// equal. Read-only aggregation; a transaction with no entries
    /// trivially balances at zero.
    pub async fn verify_double_entry_balance(
        &self,
        transaction_id: Uuid,
    ) -> Result<bool, AppError> {
        let (debit_sum, credit_sum) = self.store.sums_for_transaction(transaction_id).await?;
        Ok(debit_sum == credit_sum)
    }

    /// Net balance of one account type across every entry, using standard
    /// accounting sign conventions: asset/expense accounts are
    /// debits − credits, liability/equity/revenue accounts are
    /// credits − debits.
    pub async fn calculate_account_balance(
        &self,
        account_type: AccountType,
    ) -> Result<Decimal, AppError> {
        let (debit_sum, credit_sum) = self.store.sums_for_account(account_type).await?;
        Ok(account_type.net_balance(debit_sum, credit_sum))
    }
}
