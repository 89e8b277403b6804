//! Wallet data model and API request/response types.
//!
//! This module defines:
//! - `Wallet`: one per user, holding available and escrowed balances
//! - `Currency` and `WalletStatus` enumerations
//! - `CreateWalletRequest` / `WalletResponse` API types
//!
//! # Balance Invariants
//!
//! `balance >= 0` and `escrow_balance >= 0` at all times; the total held by
//! the wallet is `balance + escrow_balance`. Both are fixed-point decimals
//! with 4 fractional digits. ALL balance mutations go through the methods on
//! `Wallet` — they validate first and only then apply, so a failed call
//! leaves the wallet untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::money::{MONEY_SCALE, validate_amount};

/// Supported settlement currencies (ISO 4217).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ngn,
    Ghs,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ngn => "NGN",
            Currency::Ghs => "GHS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "NGN" => Ok(Currency::Ngn),
            "GHS" => Ok(Currency::Ghs),
            other => Err(AppError::Validation(format!(
                "Unsupported currency: {other}"
            ))),
        }
    }
}

/// Wallet lifecycle status.
///
/// Active and suspended convert back and forth; closed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Suspended,
    Closed,
}

impl WalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Suspended => "suspended",
            WalletStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WalletStatus::Active),
            "suspended" => Ok(WalletStatus::Suspended),
            "closed" => Ok(WalletStatus::Closed),
            other => Err(AppError::Validation(format!(
                "Unknown wallet status: {other}"
            ))),
        }
    }
}

/// A user's wallet.
///
/// # Database Table
///
/// Maps to the `wallets` table. One wallet per user, enforced by a unique
/// constraint on `user_id`. Balances are `NUMERIC(19, 4)` columns; the
/// non-negative invariants are additionally backed by CHECK constraints.
#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    /// Unique identifier for this wallet
    pub id: Uuid,

    /// Owning user. One wallet per user.
    pub user_id: Uuid,

    /// Spendable balance. Never negative.
    pub balance: Decimal,

    /// Funds held in escrow, outside the spendable balance. Never negative.
    pub escrow_balance: Decimal,

    /// Settlement currency
    pub currency: Currency,

    /// Lifecycle status
    pub status: WalletStatus,

    /// Timestamp when the wallet was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last balance or status change
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new active wallet with an empty escrow balance.
    ///
    /// # Errors
    ///
    /// `Validation` if the initial balance is negative or carries more than
    /// 4 decimal places.
    pub fn new(user_id: Uuid, currency: Currency, initial_balance: Decimal) -> Result<Self, AppError> {
        if initial_balance < Decimal::ZERO {
            return Err(AppError::Validation(
                "Initial balance must not be negative".to_string(),
            ));
        }
        if initial_balance.normalize().scale() > MONEY_SCALE {
            return Err(AppError::Validation(format!(
                "Initial balance must have at most {MONEY_SCALE} decimal places"
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            balance: initial_balance,
            escrow_balance: Decimal::ZERO,
            currency,
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Total funds held by the wallet (available + escrowed).
    pub fn total_balance(&self) -> Decimal {
        self.balance + self.escrow_balance
    }

    fn ensure_active(&self) -> Result<(), AppError> {
        if self.status != WalletStatus::Active {
            return Err(AppError::Validation(format!(
                "Wallet is not active (status: {})",
                self.status
            )));
        }
        Ok(())
    }

    /// Add funds to the available balance.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is invalid or the wallet is not active
    pub fn add(&mut self, amount: Decimal) -> Result<(), AppError> {
        validate_amount(amount)?;
        self.ensure_active()?;
        self.balance += amount;
        Ok(())
    }

    /// Remove funds from the available balance.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is invalid or the wallet is not active
    /// - `InsufficientFunds` if the available balance is below the amount
    pub fn deduct(&mut self, amount: Decimal) -> Result<(), AppError> {
        validate_amount(amount)?;
        self.ensure_active()?;
        if self.balance < amount {
            return Err(AppError::InsufficientFunds);
        }
        self.balance -= amount;
        Ok(())
    }

    /// Move funds from the available balance into escrow.
    ///
    /// Both sides change together; the total balance is unchanged.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is invalid
    /// - `InsufficientFunds` if the available balance is below the amount
    pub fn move_to_escrow(&mut self, amount: Decimal) -> Result<(), AppError> {
        validate_amount(amount)?;
        if self.balance < amount {
            return Err(AppError::InsufficientFunds);
        }
        self.balance -= amount;
        self.escrow_balance += amount;
        Ok(())
    }

    /// Move funds from escrow back into the available balance.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is invalid
    /// - `InsufficientEscrow` if the escrowed balance is below the amount
    pub fn release_from_escrow(&mut self, amount: Decimal) -> Result<(), AppError> {
        validate_amount(amount)?;
        if self.escrow_balance < amount {
            return Err(AppError::InsufficientEscrow);
        }
        self.escrow_balance -= amount;
        self.balance += amount;
        Ok(())
    }

    /// Suspend the wallet. Balance mutations via add/deduct are refused
    /// while suspended.
    ///
    /// # Errors
    ///
    /// `StateConflict` if the wallet is closed.
    pub fn suspend(&mut self) -> Result<(), AppError> {
        if self.status == WalletStatus::Closed {
            return Err(AppError::StateConflict(
                "Cannot suspend a closed wallet".to_string(),
            ));
        }
        self.status = WalletStatus::Suspended;
        Ok(())
    }

    /// Reactivate a suspended wallet.
    ///
    /// # Errors
    ///
    /// `StateConflict` if the wallet is closed.
    pub fn activate(&mut self) -> Result<(), AppError> {
        if self.status == WalletStatus::Closed {
            return Err(AppError::StateConflict(
                "Cannot activate a closed wallet".to_string(),
            ));
        }
        self.status = WalletStatus::Active;
        Ok(())
    }

    /// Close the wallet permanently.
    ///
    /// # Errors
    ///
    /// - `StateConflict` if the wallet is already closed
    /// - `Validation` unless both balances are exactly zero
    pub fn close(&mut self) -> Result<(), AppError> {
        if self.status == WalletStatus::Closed {
            return Err(AppError::StateConflict(
                "Wallet is already closed".to_string(),
            ));
        }
        if !self.balance.is_zero() || !self.escrow_balance.is_zero() {
            return Err(AppError::Validation(
                "Wallet balances must be zero before closing".to_string(),
            ));
        }
        self.status = WalletStatus::Closed;
        Ok(())
    }
}

/// Request body for creating a new wallet.
///
/// # JSON Example
///
/// ```json
/// {
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "currency": "USD",
///   "initial_balance": "100.0000"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    /// Owning user
    pub user_id: Uuid,

    /// Settlement currency (defaults to USD if not provided)
    #[serde(default = "default_currency")]
    pub currency: Currency,

    /// Initial available balance (defaults to 0 if not provided)
    #[serde(default)]
    pub initial_balance: Decimal,
}

fn default_currency() -> Currency {
    Currency::Usd
}

/// Response body for wallet endpoints.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub escrow_balance: Decimal,
    pub currency: Currency,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            user_id: wallet.user_id,
            balance: wallet.balance,
            escrow_balance: wallet.escrow_balance,
            currency: wallet.currency,
            status: wallet.status,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wallet_with(balance: Decimal) -> Wallet {
        Wallet::new(Uuid::new_v4(), Currency::Usd, balance).unwrap()
    }

    #[test]
    fn new_wallet_starts_active_with_zero_escrow() {
        let w = wallet_with(dec!(25.5000));
        assert_eq!(w.status, WalletStatus::Active);
        assert_eq!(w.balance, dec!(25.5000));
        assert_eq!(w.escrow_balance, Decimal::ZERO);
    }

    #[test]
    fn new_wallet_rejects_negative_initial_balance() {
        assert!(Wallet::new(Uuid::new_v4(), Currency::Usd, dec!(-1)).is_err());
    }

    #[test]
    fn add_and_deduct_respect_active_status() {
        let mut w = wallet_with(dec!(100));
        w.add(dec!(50)).unwrap();
        assert_eq!(w.balance, dec!(150));

        w.suspend().unwrap();
        assert!(matches!(w.add(dec!(1)), Err(AppError::Validation(_))));
        assert!(matches!(w.deduct(dec!(1)), Err(AppError::Validation(_))));

        w.activate().unwrap();
        w.deduct(dec!(150)).unwrap();
        assert_eq!(w.balance, Decimal::ZERO);
    }

    #[test]
    fn deduct_fails_on_insufficient_balance_without_mutating() {
        let mut w = wallet_with(dec!(10));
        assert!(matches!(
            w.deduct(dec!(10.0001)),
            Err(AppError::InsufficientFunds)
        ));
        assert_eq!(w.balance, dec!(10));
    }

    #[test]
    fn escrow_moves_preserve_total_balance() {
        let mut w = wallet_with(dec!(500.00));
        w.move_to_escrow(dec!(105.00)).unwrap();
        assert_eq!(w.balance, dec!(395.00));
        assert_eq!(w.escrow_balance, dec!(105.00));
        assert_eq!(w.total_balance(), dec!(500.00));

        w.release_from_escrow(dec!(105.00)).unwrap();
        assert_eq!(w.balance, dec!(500.00));
        assert_eq!(w.escrow_balance, Decimal::ZERO);
    }

    #[test]
    fn release_fails_on_insufficient_escrow() {
        let mut w = wallet_with(dec!(100));
        w.move_to_escrow(dec!(40)).unwrap();
        assert!(matches!(
            w.release_from_escrow(dec!(40.0001)),
            Err(AppError::InsufficientEscrow)
        ));
        assert_eq!(w.escrow_balance, dec!(40));
    }

    #[test]
    fn escrow_moves_work_while_suspended() {
        // Suspension blocks spending, not the escrow settlement path.
        let mut w = wallet_with(dec!(100));
        w.move_to_escrow(dec!(60)).unwrap();
        w.suspend().unwrap();
        w.release_from_escrow(dec!(60)).unwrap();
        assert_eq!(w.balance, dec!(100));
    }

    #[test]
    fn close_requires_zero_balances_and_is_terminal() {
        let mut w = wallet_with(dec!(10));
        assert!(matches!(w.close(), Err(AppError::Validation(_))));

        w.deduct(dec!(10)).unwrap();
        w.close().unwrap();
        assert_eq!(w.status, WalletStatus::Closed);

        assert!(matches!(w.suspend(), Err(AppError::StateConflict(_))));
        assert!(matches!(w.activate(), Err(AppError::StateConflict(_))));
        assert!(matches!(w.close(), Err(AppError::StateConflict(_))));
    }

    #[test]
    fn currency_round_trips_through_strings() {
        for c in [Currency::Usd, Currency::Ngn, Currency::Ghs] {
            assert_eq!(c.as_str().parse::<Currency>().unwrap(), c);
        }
        assert!("EUR".parse::<Currency>().is_err());
    }
}
