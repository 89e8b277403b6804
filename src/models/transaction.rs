//! Transaction data model and API request/response types.
//!
//! A transaction is the audit record of one money movement. Identity fields
//! (reference, wallet, kind, amount, currency) are fixed at creation; only
//! the status, gateway reference and metadata evolve, and the status follows
//! a strict state machine:
//!
//! ```text
//! pending ──> processing ──> completed
//!    │             │
//!    │             └───────> failed
//!    ├──> completed | failed | cancelled
//! ```
//!
//! Completed is financially final: no transition leaves it. Failed and
//! cancelled are terminal except that a pending/processing record can still
//! be marked failed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::money::validate_amount;
use crate::models::wallet::Currency;

/// Well-known metadata keys.
///
/// Metadata is an open string-to-JSON map for audit context; these are the
/// keys the escrow protocol reads back. Monetary values are stored as
/// strings so they survive JSON without losing decimal exactness.
pub mod meta {
    /// Task the escrow hold/release belongs to
    pub const TASK_ID: &str = "task_id";
    /// Counterparty wallet receiving the payout
    pub const PAYEE_WALLET_ID: &str = "payee_wallet_id";
    /// Counterparty wallet that funded the escrow
    pub const PAYER_WALLET_ID: &str = "payer_wallet_id";
    /// Payment amount before the platform fee
    pub const BASE_AMOUNT: &str = "base_amount";
    /// Absolute platform fee held alongside the base amount
    pub const PLATFORM_FEE: &str = "platform_fee";
    /// Fee percentage the hold was computed with
    pub const PLATFORM_FEE_PERCENTAGE: &str = "platform_fee_percentage";
    /// Escrow protocol step: "hold", "release" or "refund"
    pub const ESCROW_TYPE: &str = "escrow_type";
    /// Role of the record in a release: "payment" or "receipt"
    pub const TRANSACTION_TYPE: &str = "transaction_type";
    /// Failure message recorded by `mark_as_failed`
    pub const ERROR: &str = "error";
}

/// Kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Refund,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Payment => "payment",
            TransactionKind::Refund => "refund",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "transfer" => Ok(TransactionKind::Transfer),
            "payment" => Ok(TransactionKind::Payment),
            "refund" => Ok(TransactionKind::Refund),
            other => Err(AppError::Validation(format!(
                "Unknown transaction kind: {other}"
            ))),
        }
    }
}

/// Transaction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "processing" => Ok(TransactionStatus::Processing),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            other => Err(AppError::Validation(format!(
                "Unknown transaction status: {other}"
            ))),
        }
    }
}

/// Input for creating a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    /// Caller-supplied reference; generated when absent
    pub reference: Option<String>,
    pub gateway_reference: Option<String>,
    pub metadata: Map<String, Value>,
    pub description: Option<String>,
}

/// A transaction record.
///
/// # Database Table
///
/// Maps to the `transactions` table. `reference` carries a global unique
/// constraint; `wallet_id` references the owning wallet.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// Owning wallet
    pub wallet_id: Uuid,

    /// Globally unique, human-inspectable reference
    /// (e.g. `TXN-20250806120000-1A2B3C4D`)
    pub reference: String,

    /// Kind of money movement
    pub kind: TransactionKind,

    /// Amount moved. Strictly positive, scale 4.
    pub amount: Decimal,

    /// Currency of the owning wallet at creation time
    pub currency: Currency,

    /// Lifecycle status
    pub status: TransactionStatus,

    /// Optional external (gateway) identifier
    pub gateway_reference: Option<String>,

    /// Open key-value bag for audit context (see [`meta`])
    pub metadata: Map<String, Value>,

    /// Human-readable description
    pub description: Option<String>,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,

    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a pending transaction, generating a reference if the caller
    /// did not supply one.
    ///
    /// # Errors
    ///
    /// `Validation` if the amount is zero, negative, or finer than scale 4.
    pub fn new(input: NewTransaction) -> Result<Self, AppError> {
        validate_amount(input.amount)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            wallet_id: input.wallet_id,
            reference: input.reference.unwrap_or_else(Self::generate_reference),
            kind: input.kind,
            amount: input.amount,
            currency: input.currency,
            status: TransactionStatus::Pending,
            gateway_reference: input.gateway_reference,
            metadata: input.metadata,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    /// Generate a unique reference: `TXN-<UTC timestamp>-<8 hex chars>`.
    pub fn generate_reference() -> String {
        format!(
            "TXN-{}-{:08X}",
            Utc::now().format("%Y%m%d%H%M%S"),
            rand::random::<u32>()
        )
    }

    /// Move `pending` -> `processing`.
    ///
    /// # Errors
    ///
    /// `StateConflict` unless the current status is exactly `pending`.
    pub fn mark_as_processing(&mut self) -> Result<(), AppError> {
        if self.status != TransactionStatus::Pending {
            return Err(AppError::StateConflict(format!(
                "Cannot start processing a {} transaction",
                self.status
            )));
        }
        self.set_status(TransactionStatus::Processing);
        Ok(())
    }

    /// Move `pending`/`processing` -> `completed`, optionally recording the
    /// gateway's identifier.
    ///
    /// # Errors
    ///
    /// `StateConflict` if the transaction is already completed, failed or
    /// cancelled.
    pub fn mark_as_completed(&mut self, gateway_reference: Option<String>) -> Result<(), AppError> {
        match self.status {
            TransactionStatus::Completed
            | TransactionStatus::Failed
            | TransactionStatus::Cancelled => {
                return Err(AppError::StateConflict(format!(
                    "Cannot complete a {} transaction",
                    self.status
                )));
            }
            TransactionStatus::Pending | TransactionStatus::Processing => {}
        }
        if gateway_reference.is_some() {
            self.gateway_reference = gateway_reference;
        }
        self.set_status(TransactionStatus::Completed);
        Ok(())
    }

    /// Move any non-completed status -> `failed`, recording the error
    /// message under metadata key `error`.
    ///
    /// # Errors
    ///
    /// `StateConflict` only if the transaction is already completed.
    pub fn mark_as_failed(&mut self, error_message: Option<String>) -> Result<(), AppError> {
        if self.status == TransactionStatus::Completed {
            return Err(AppError::StateConflict(
                "Cannot fail a completed transaction".to_string(),
            ));
        }
        if let Some(msg) = error_message {
            self.metadata.insert(meta::ERROR.to_string(), Value::String(msg));
        }
        self.set_status(TransactionStatus::Failed);
        Ok(())
    }

    /// Move `pending` -> `cancelled`.
    ///
    /// # Errors
    ///
    /// `StateConflict` unless the current status is exactly `pending`.
    pub fn cancel(&mut self) -> Result<(), AppError> {
        if self.status != TransactionStatus::Pending {
            return Err(AppError::StateConflict(format!(
                "Cannot cancel a {} transaction",
                self.status
            )));
        }
        self.set_status(TransactionStatus::Cancelled);
        Ok(())
    }

    fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Read a metadata value as a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Read a metadata value stored as a decimal string.
    pub fn metadata_decimal(&self, key: &str) -> Option<Decimal> {
        self.metadata_str(key).and_then(|s| s.parse().ok())
    }
}

/// Filter for transaction listing. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub wallet_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
}

/// One page of transactions, newest first.
#[derive(Debug)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Total matching rows across all pages
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    /// `ceil(total / page_size)`
    pub total_pages: i64,
}

/// Response body for transaction endpoints.
///
/// Metadata stays internal; clients see the audit-relevant surface only.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub reference: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub gateway_reference: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            wallet_id: tx.wallet_id,
            reference: tx.reference,
            kind: tx.kind,
            amount: tx.amount,
            currency: tx.currency,
            status: tx.status,
            gateway_reference: tx.gateway_reference,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending_tx() -> Transaction {
        Transaction::new(NewTransaction {
            wallet_id: Uuid::new_v4(),
            kind: TransactionKind::Payment,
            amount: dec!(105.00),
            currency: Currency::Usd,
            reference: None,
            gateway_reference: None,
            metadata: Map::new(),
            description: None,
        })
        .unwrap()
    }

    #[test]
    fn new_transaction_rejects_non_positive_amounts() {
        let mut input = NewTransaction {
            wallet_id: Uuid::new_v4(),
            kind: TransactionKind::Deposit,
            amount: Decimal::ZERO,
            currency: Currency::Usd,
            reference: None,
            gateway_reference: None,
            metadata: Map::new(),
            description: None,
        };
        assert!(Transaction::new(input.clone()).is_err());
        input.amount = dec!(-5);
        assert!(Transaction::new(input).is_err());
    }

    #[test]
    fn generated_reference_has_expected_shape() {
        let reference = Transaction::generate_reference();
        let parts: Vec<&str> = reference.splitn(3, '-').collect();
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn pending_to_processing_to_completed() {
        let mut tx = pending_tx();
        tx.mark_as_processing().unwrap();
        assert_eq!(tx.status, TransactionStatus::Processing);
        tx.mark_as_completed(Some("gw-123".to_string())).unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.gateway_reference.as_deref(), Some("gw-123"));
    }

    #[test]
    fn completing_twice_fails() {
        let mut tx = pending_tx();
        tx.mark_as_completed(None).unwrap();
        assert!(matches!(
            tx.mark_as_completed(None),
            Err(AppError::StateConflict(_))
        ));
    }

    #[test]
    fn processing_requires_pending_source() {
        let mut tx = pending_tx();
        tx.cancel().unwrap();
        assert!(matches!(
            tx.mark_as_processing(),
            Err(AppError::StateConflict(_))
        ));
    }

    #[test]
    fn cancel_requires_pending_source() {
        let mut tx = pending_tx();
        tx.mark_as_processing().unwrap();
        assert!(matches!(tx.cancel(), Err(AppError::StateConflict(_))));
    }

    #[test]
    fn failing_is_allowed_from_everything_except_completed() {
        let mut tx = pending_tx();
        tx.cancel().unwrap();
        tx.mark_as_failed(Some("gateway timeout".to_string()))
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.metadata_str(meta::ERROR), Some("gateway timeout"));

        let mut done = pending_tx();
        done.mark_as_completed(None).unwrap();
        assert!(matches!(
            done.mark_as_failed(None),
            Err(AppError::StateConflict(_))
        ));
    }

    #[test]
    fn metadata_decimal_round_trips_exactly() {
        let mut tx = pending_tx();
        tx.metadata.insert(
            meta::PLATFORM_FEE.to_string(),
            Value::String(dec!(5.0001).to_string()),
        );
        assert_eq!(tx.metadata_decimal(meta::PLATFORM_FEE), Some(dec!(5.0001)));
    }
}
