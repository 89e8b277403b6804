//! Ledger entry data model.
//!
//! Double-entry bookkeeping records. Every financial event produces entries
//! in matched pairs — one debit and one credit of equal magnitude against
//! the same transaction — so the sum of all debits always equals the sum of
//! all credits for that transaction.
//!
//! A `LedgerEntry` is append-only: it is constructed once through the
//! [`LedgerEntry::debit`] / [`LedgerEntry::credit`] factories, exposes no
//! mutating methods, and stores only ever insert it. Fields are private so
//! an entry cannot be edited after construction even in-process.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::money::validate_amount;

/// Double-entry account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }

    /// Whether this account type increases on the debit side.
    ///
    /// Asset and expense accounts are debit-normal; liability, equity and
    /// revenue accounts are credit-normal.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Net balance of the account given its debit and credit sums, using
    /// standard accounting sign conventions.
    pub fn net_balance(&self, debit_sum: Decimal, credit_sum: Decimal) -> Decimal {
        if self.is_debit_normal() {
            debit_sum - credit_sum
        } else {
            credit_sum - debit_sum
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" => Ok(AccountType::Revenue),
            "expense" => Ok(AccountType::Expense),
            other => Err(AppError::Validation(format!(
                "Unknown account type: {other}"
            ))),
        }
    }
}

/// One immutable double-entry bookkeeping record.
///
/// # Database Table
///
/// Maps to the `ledger_entries` table. `transaction_id` references the
/// owning transaction. Exactly one of `debit_amount`/`credit_amount` is
/// strictly positive and the other is exactly zero, additionally backed by a
/// CHECK constraint.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    id: Uuid,
    transaction_id: Uuid,
    account_type: AccountType,
    debit_amount: Decimal,
    credit_amount: Decimal,
    balance_after: Decimal,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a debit entry.
    ///
    /// # Errors
    ///
    /// `Validation` if the amount is zero, negative, or finer than scale 4.
    pub fn debit(
        transaction_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        balance_after: Decimal,
        description: Option<String>,
    ) -> Result<Self, AppError> {
        validate_amount(amount)?;
        Ok(Self {
            id: Uuid::new_v4(),
            transaction_id,
            account_type,
            debit_amount: amount,
            credit_amount: Decimal::ZERO,
            balance_after,
            description,
            created_at: Utc::now(),
        })
    }

    /// Create a credit entry.
    ///
    /// # Errors
    ///
    /// `Validation` if the amount is zero, negative, or finer than scale 4.
    pub fn credit(
        transaction_id: Uuid,
        account_type: AccountType,
        amount: Decimal,
        balance_after: Decimal,
        description: Option<String>,
    ) -> Result<Self, AppError> {
        validate_amount(amount)?;
        Ok(Self {
            id: Uuid::new_v4(),
            transaction_id,
            account_type,
            debit_amount: Decimal::ZERO,
            credit_amount: amount,
            balance_after,
            description,
            created_at: Utc::now(),
        })
    }

    /// Rehydrate an entry from its persisted fields. Store adapters only.
    pub(crate) fn from_stored(
        id: Uuid,
        transaction_id: Uuid,
        account_type: AccountType,
        debit_amount: Decimal,
        credit_amount: Decimal,
        balance_after: Decimal,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            transaction_id,
            account_type,
            debit_amount,
            credit_amount,
            balance_after,
            description,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn debit_amount(&self) -> Decimal {
        self.debit_amount
    }

    pub fn credit_amount(&self) -> Decimal {
        self.credit_amount
    }

    /// Account balance snapshot immediately after this entry posted.
    pub fn balance_after(&self) -> Decimal {
        self.balance_after
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn debit_entry_has_zero_credit_side() {
        let entry = LedgerEntry::debit(
            Uuid::new_v4(),
            AccountType::Asset,
            dec!(50.00),
            dec!(150.00),
            Some("escrow funding".to_string()),
        )
        .unwrap();
        assert_eq!(entry.debit_amount(), dec!(50.00));
        assert_eq!(entry.credit_amount(), Decimal::ZERO);
        assert_eq!(entry.balance_after(), dec!(150.00));
    }

    #[test]
    fn credit_entry_has_zero_debit_side() {
        let entry =
            LedgerEntry::credit(Uuid::new_v4(), AccountType::Liability, dec!(50.00), dec!(50.00), None)
                .unwrap();
        assert_eq!(entry.credit_amount(), dec!(50.00));
        assert_eq!(entry.debit_amount(), Decimal::ZERO);
    }

    #[test]
    fn factories_reject_non_positive_amounts() {
        assert!(
            LedgerEntry::debit(Uuid::new_v4(), AccountType::Asset, Decimal::ZERO, dec!(1), None)
                .is_err()
        );
        assert!(
            LedgerEntry::credit(Uuid::new_v4(), AccountType::Revenue, dec!(-1), dec!(1), None)
                .is_err()
        );
    }

    #[test]
    fn net_balance_follows_sign_conventions() {
        // Asset/expense: debits - credits
        assert_eq!(
            AccountType::Asset.net_balance(dec!(100), dec!(30)),
            dec!(70)
        );
        assert_eq!(
            AccountType::Expense.net_balance(dec!(10), dec!(4)),
            dec!(6)
        );
        // Liability/equity/revenue: credits - debits
        assert_eq!(
            AccountType::Liability.net_balance(dec!(30), dec!(100)),
            dec!(70)
        );
        assert_eq!(
            AccountType::Equity.net_balance(dec!(0), dec!(25)),
            dec!(25)
        );
        assert_eq!(
            AccountType::Revenue.net_balance(dec!(5), dec!(20)),
            dec!(15)
        );
    }
}
