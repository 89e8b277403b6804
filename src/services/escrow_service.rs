//! Escrow service - two-phase hold/release protocol for task payments.
//!
//! A hold moves the payment amount plus the platform fee out of the payer's
//! spendable balance into escrow and records a pending payment transaction.
//! A release walks the money out again: escrow -> available -> deducted from
//! the payer, with only the base amount credited to the payee (the platform
//! retains the fee).
//!
//! There is no database transaction wrapping a whole protocol run — each
//! wallet mutation commits independently. Correctness on partial failure
//! therefore rests entirely on the compensation steps: when a later step
//! fails, the already-committed earlier steps are reversed one by one and
//! the original error is re-raised. A failed reversal is a
//! `CompensationFailed` — a wallet/ledger inconsistency that is logged
//! loudly and never swallowed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::money::{round_money, validate_amount};
use crate::models::transaction::{
    NewTransaction, Transaction, TransactionKind, TransactionStatus, meta,
};
use crate::models::wallet::Wallet;
use crate::services::{TransactionService, WalletService};

/// Escrow service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EscrowConfig {
    /// Fee percentage applied when an inbound event does not carry one.
    pub default_platform_fee_percentage: Decimal,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            // 5%
            default_platform_fee_percentage: Decimal::new(5, 2),
        }
    }
}

/// Where a task's escrowed funds currently are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowState {
    Held,
    Released,
    Refunded,
}

/// Result of a hold, release or refund.
#[derive(Debug, Clone, Serialize)]
pub struct EscrowReceipt {
    pub task_id: String,
    pub payer_wallet_id: Uuid,
    pub payee_wallet_id: Option<Uuid>,
    /// Payment amount before the platform fee
    pub amount: Decimal,
    pub platform_fee: Decimal,
    /// Amount actually held in / released from escrow
    pub total_amount: Decimal,
    pub status: EscrowState,
    pub transaction_id: Uuid,
}

/// Result of a status query.
#[derive(Debug, Clone, Serialize)]
pub struct EscrowStatus {
    pub task_id: String,
    pub status: EscrowState,
    pub transaction_id: Uuid,
    pub total_amount: Decimal,
}

/// Orchestrates the escrow protocol over the wallet and transaction
/// services. Cheap to clone.
#[derive(Clone)]
pub struct EscrowService {
    wallets: WalletService,
    transactions: TransactionService,
    config: EscrowConfig,
}

fn validate_fee_percentage(percentage: Decimal) -> Result<(), AppError> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE {
        return Err(AppError::Validation(
            "Platform fee percentage must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

fn decimal_value(amount: Decimal) -> Value {
    // Stored as a string so the exact scale survives JSON.
    Value::String(amount.to_string())
}

impl EscrowService {
    pub fn new(
        wallets: WalletService,
        transactions: TransactionService,
        config: EscrowConfig,
    ) -> Self {
        Self {
            wallets,
            transactions,
            config,
        }
    }

    /// Fee percentage used when an inbound event does not carry one.
    pub fn default_platform_fee_percentage(&self) -> Decimal {
        self.config.default_platform_fee_percentage
    }

    async fn load_wallet(&self, wallet_id: Uuid) -> Result<Wallet, AppError> {
        self.wallets
            .get_wallet(wallet_id)
            .await?
            .ok_or(AppError::WalletNotFound)
    }

    /// Load the pending hold transaction for a task and check it belongs to
    /// the expected payer wallet.
    async fn load_hold(&self, task_id: &str, payer_wallet_id: Uuid) -> Result<Transaction, AppError> {
        let hold = self
            .transactions
            .find_latest_for_task(task_id)
            .await?
            .ok_or_else(|| AppError::EscrowNotFound(task_id.to_string()))?;

        if hold.status != TransactionStatus::Pending {
            return Err(AppError::StateConflict(format!(
                "Escrow for task {task_id} is not held (transaction status: {})",
                hold.status
            )));
        }
        if hold.wallet_id != payer_wallet_id {
            return Err(AppError::Validation(format!(
                "Escrow for task {task_id} was held on a different wallet"
            )));
        }
        Ok(hold)
    }

    /// Hold `amount` plus the platform fee from the payer's available
    /// balance in escrow, pending task verification.
    ///
    /// # Process
    ///
    /// 1. Validate amount and fee percentage
    /// 2. Load both wallets, require matching currencies
    /// 3. `total = amount + round4(amount * fee_pct)`; require
    ///    `payer.balance >= total`
    /// 4. Move `total` into escrow (single wallet mutation)
    /// 5. Record the pending payment transaction carrying the full escrow
    ///    metadata — the release step reads the held amounts back from it
    ///
    /// If step 5 fails the escrow move is unwound so no funds are ever held
    /// without an audit record.
    pub async fn hold_funds(
        &self,
        task_id: &str,
        payer_wallet_id: Uuid,
        payee_wallet_id: Uuid,
        amount: Decimal,
        platform_fee_percentage: Decimal,
    ) -> Result<EscrowReceipt, AppError> {
        validate_amount(amount)?;
        validate_fee_percentage(platform_fee_percentage)?;

        let payer = self.load_wallet(payer_wallet_id).await?;
        let payee = self.load_wallet(payee_wallet_id).await?;
        if payer.currency != payee.currency {
            return Err(AppError::Validation(
                "Payer and payee wallets use different currencies".to_string(),
            ));
        }

        let platform_fee = round_money(amount * platform_fee_percentage);
        let total_amount = amount + platform_fee;
        if payer.balance < total_amount {
            return Err(AppError::InsufficientFunds);
        }

        self.wallets
            .move_to_escrow(payer_wallet_id, total_amount)
            .await?;

        let mut metadata = Map::new();
        metadata.insert(meta::TASK_ID.into(), Value::String(task_id.to_string()));
        metadata.insert(
            meta::PAYEE_WALLET_ID.into(),
            Value::String(payee_wallet_id.to_string()),
        );
        metadata.insert(meta::BASE_AMOUNT.into(), decimal_value(amount));
        metadata.insert(meta::PLATFORM_FEE.into(), decimal_value(platform_fee));
        metadata.insert(
            meta::PLATFORM_FEE_PERCENTAGE.into(),
            decimal_value(platform_fee_percentage),
        );
        metadata.insert(meta::ESCROW_TYPE.into(), Value::String("hold".to_string()));

        let created = self
            .transactions
            .create_transaction(NewTransaction {
                wallet_id: payer_wallet_id,
                kind: TransactionKind::Payment,
                amount: total_amount,
                currency: payer.currency,
                reference: None,
                gateway_reference: None,
                metadata,
                description: Some(format!("Escrow hold for task {task_id}")),
            })
            .await;

        let transaction = match created {
            Ok(transaction) => transaction,
            Err(original) => {
                tracing::warn!(
                    task_id,
                    error = %original,
                    "recording escrow hold failed, unwinding the escrow move"
                );
                return Err(
                    match self
                        .wallets
                        .release_from_escrow(payer_wallet_id, total_amount)
                        .await
                    {
                        Ok(_) => original,
                        Err(compensation) => AppError::CompensationFailed {
                            original: Box::new(original),
                            compensation: Box::new(compensation),
                        },
                    },
                );
            }
        };

        tracing::info!(
            task_id,
            payer_wallet_id = %payer_wallet_id,
            payee_wallet_id = %payee_wallet_id,
            %total_amount,
            transaction_id = %transaction.id,
            "escrow held"
        );

        Ok(EscrowReceipt {
            task_id: task_id.to_string(),
            payer_wallet_id,
            payee_wallet_id: Some(payee_wallet_id),
            amount,
            platform_fee,
            total_amount,
            status: EscrowState::Held,
            transaction_id: transaction.id,
        })
    }

    /// Release a task's held funds: the payer pays `total` out of escrow and
    /// the payee is credited the base amount; the platform retains the fee.
    ///
    /// The hold transaction's metadata — not the caller — is the source of
    /// truth for the held amounts. The caller-supplied amount and fee
    /// percentage must match what was actually held, otherwise the call
    /// fails validation before touching any balance.
    ///
    /// # Steps and compensation
    ///
    /// - Step A: `release_from_escrow(payer, total)`
    /// - Step B: `deduct_balance(payer, total)` — on failure, the escrow
    ///   move is restored (re-`move_to_escrow`) and the original error is
    ///   re-raised
    /// - Step C: `add_balance(payee, base)` — on failure, step B then step A
    ///   are reversed in that order, and the original error is re-raised
    pub async fn release_funds(
        &self,
        task_id: &str,
        payer_wallet_id: Uuid,
        payee_wallet_id: Uuid,
        amount: Decimal,
        platform_fee_percentage: Decimal,
    ) -> Result<EscrowReceipt, AppError> {
        validate_amount(amount)?;
        validate_fee_percentage(platform_fee_percentage)?;

        let payer = self.load_wallet(payer_wallet_id).await?;
        self.load_wallet(payee_wallet_id).await?;

        let hold = self.load_hold(task_id, payer_wallet_id).await?;
        let total_amount = hold.amount;
        let base_amount = hold
            .metadata_decimal(meta::BASE_AMOUNT)
            .ok_or_else(|| AppError::Validation(
                "Hold transaction is missing escrow metadata".to_string(),
            ))?;
        let platform_fee = hold
            .metadata_decimal(meta::PLATFORM_FEE)
            .ok_or_else(|| AppError::Validation(
                "Hold transaction is missing escrow metadata".to_string(),
            ))?;

        if amount != base_amount {
            return Err(AppError::Validation(format!(
                "Release amount {amount} does not match held amount {base_amount}"
            )));
        }
        if round_money(amount * platform_fee_percentage) != platform_fee {
            return Err(AppError::Validation(format!(
                "Release fee percentage {platform_fee_percentage} does not match the held platform fee"
            )));
        }

        if payer.escrow_balance < total_amount {
            return Err(AppError::InsufficientEscrow);
        }

        // Step A: escrow -> available
        self.wallets
            .release_from_escrow(payer_wallet_id, total_amount)
            .await?;

        // Step B: the actual payment out of the payer's balance
        if let Err(original) = self
            .wallets
            .deduct_balance(payer_wallet_id, total_amount)
            .await
        {
            tracing::warn!(task_id, error = %original, "release payment step failed, compensating");
            return Err(
                match self
                    .wallets
                    .move_to_escrow(payer_wallet_id, total_amount)
                    .await
                {
                    Ok(_) => original,
                    Err(compensation) => AppError::CompensationFailed {
                        original: Box::new(original),
                        compensation: Box::new(compensation),
                    },
                },
            );
        }

        // Step C: credit the payee with the base amount only
        if let Err(original) = self
            .wallets
            .add_balance(payee_wallet_id, base_amount)
            .await
        {
            tracing::warn!(task_id, error = %original, "payee credit failed, compensating");
            let rollback = async {
                self.wallets
                    .add_balance(payer_wallet_id, total_amount)
                    .await?;
                self.wallets
                    .move_to_escrow(payer_wallet_id, total_amount)
                    .await?;
                Ok::<(), AppError>(())
            };
            return Err(match rollback.await {
                Ok(()) => original,
                Err(compensation) => AppError::CompensationFailed {
                    original: Box::new(original),
                    compensation: Box::new(compensation),
                },
            });
        }

        // Wallet state is final from here; finish the audit trail.
        self.transactions.mark_as_completed(hold.id, None).await?;

        let mut payer_meta = Map::new();
        payer_meta.insert(meta::TASK_ID.into(), Value::String(task_id.to_string()));
        payer_meta.insert(
            meta::PAYEE_WALLET_ID.into(),
            Value::String(payee_wallet_id.to_string()),
        );
        payer_meta.insert(meta::BASE_AMOUNT.into(), decimal_value(base_amount));
        payer_meta.insert(meta::PLATFORM_FEE.into(), decimal_value(platform_fee));
        payer_meta.insert(meta::ESCROW_TYPE.into(), Value::String("release".to_string()));
        payer_meta.insert(
            meta::TRANSACTION_TYPE.into(),
            Value::String("payment".to_string()),
        );

        let payer_tx = self
            .transactions
            .create_transaction(NewTransaction {
                wallet_id: payer_wallet_id,
                kind: TransactionKind::Payment,
                amount: total_amount,
                currency: payer.currency,
                reference: None,
                gateway_reference: None,
                metadata: payer_meta,
                description: Some(format!("Escrow release for task {task_id}")),
            })
            .await?;
        let payer_tx = self
            .transactions
            .mark_as_completed(payer_tx.id, None)
            .await?;

        let mut payee_meta = Map::new();
        payee_meta.insert(meta::TASK_ID.into(), Value::String(task_id.to_string()));
        payee_meta.insert(
            meta::PAYER_WALLET_ID.into(),
            Value::String(payer_wallet_id.to_string()),
        );
        payee_meta.insert(meta::ESCROW_TYPE.into(), Value::String("release".to_string()));
        payee_meta.insert(
            meta::TRANSACTION_TYPE.into(),
            Value::String("receipt".to_string()),
        );

        let payee_tx = self
            .transactions
            .create_transaction(NewTransaction {
                wallet_id: payee_wallet_id,
                kind: TransactionKind::Deposit,
                amount: base_amount,
                currency: payer.currency,
                reference: None,
                gateway_reference: None,
                metadata: payee_meta,
                description: Some(format!("Payment received for task {task_id}")),
            })
            .await?;
        self.transactions.mark_as_completed(payee_tx.id, None).await?;

        tracing::info!(
            task_id,
            payer_wallet_id = %payer_wallet_id,
            payee_wallet_id = %payee_wallet_id,
            %total_amount,
            %base_amount,
            "escrow released"
        );

        Ok(EscrowReceipt {
            task_id: task_id.to_string(),
            payer_wallet_id,
            payee_wallet_id: Some(payee_wallet_id),
            amount: base_amount,
            platform_fee,
            total_amount,
            status: EscrowState::Released,
            transaction_id: payer_tx.id,
        })
    }

    /// Return a task's held funds (amount plus fee) to the payer's
    /// available balance, e.g. when the task was rejected.
    ///
    /// The hold transaction is cancelled and a completed refund transaction
    /// is recorded, so the refund stays on the audit trail like every other
    /// balance change.
    pub async fn refund_funds(
        &self,
        task_id: &str,
        payer_wallet_id: Uuid,
    ) -> Result<EscrowReceipt, AppError> {
        let payer = self.load_wallet(payer_wallet_id).await?;
        let hold = self.load_hold(task_id, payer_wallet_id).await?;

        let total_amount = hold.amount;
        let base_amount = hold
            .metadata_decimal(meta::BASE_AMOUNT)
            .unwrap_or(total_amount);
        let platform_fee = hold
            .metadata_decimal(meta::PLATFORM_FEE)
            .unwrap_or(Decimal::ZERO);

        if payer.escrow_balance < total_amount {
            return Err(AppError::InsufficientEscrow);
        }

        self.wallets
            .release_from_escrow(payer_wallet_id, total_amount)
            .await?;

        self.transactions.cancel(hold.id).await?;

        let mut metadata = Map::new();
        metadata.insert(meta::TASK_ID.into(), Value::String(task_id.to_string()));
        metadata.insert(meta::BASE_AMOUNT.into(), decimal_value(base_amount));
        metadata.insert(meta::PLATFORM_FEE.into(), decimal_value(platform_fee));
        metadata.insert(meta::ESCROW_TYPE.into(), Value::String("refund".to_string()));

        let refund_tx = self
            .transactions
            .create_transaction(NewTransaction {
                wallet_id: payer_wallet_id,
                kind: TransactionKind::Refund,
                amount: total_amount,
                currency: payer.currency,
                reference: None,
                gateway_reference: None,
                metadata,
                description: Some(format!("Escrow refund for task {task_id}")),
            })
            .await?;
        let refund_tx = self
            .transactions
            .mark_as_completed(refund_tx.id, None)
            .await?;

        tracing::info!(
            task_id,
            payer_wallet_id = %payer_wallet_id,
            %total_amount,
            "escrow refunded"
        );

        Ok(EscrowReceipt {
            task_id: task_id.to_string(),
            payer_wallet_id,
            payee_wallet_id: None,
            amount: base_amount,
            platform_fee,
            total_amount,
            status: EscrowState::Refunded,
            transaction_id: refund_tx.id,
        })
    }

    /// Where a task's escrow currently stands, derived from the newest
    /// payment transaction recorded for it: pending means held, cancelled
    /// means refunded, anything else means released. `None` if the task
    /// never had funds held.
    pub async fn get_escrow_status(
        &self,
        task_id: &str,
    ) -> Result<Option<EscrowStatus>, AppError> {
        let Some(transaction) = self.transactions.find_latest_for_task(task_id).await? else {
            return Ok(None);
        };

        let status = match transaction.status {
            TransactionStatus::Pending => EscrowState::Held,
            TransactionStatus::Cancelled => EscrowState::Refunded,
            _ => EscrowState::Released,
        };

        Ok(Some(EscrowStatus {
            task_id: task_id.to_string(),
            status,
            transaction_id: transaction.id,
            total_amount: transaction.amount,
        }))
    }
}
