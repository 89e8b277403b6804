//! End-to-end escrow protocol scenarios over the in-memory stores.
//!
//! Each test wires the real services onto fresh stores, so the full
//! hold/release/refund sequences run exactly as they do in production —
//! including the compensation paths, triggered here by suspending a wallet
//! so a mid-protocol step legitimately fails.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use taskpay::error::AppError;
use taskpay::models::transaction::{TransactionFilter, TransactionKind, TransactionStatus};
use taskpay::models::wallet::{Currency, Wallet};
use taskpay::services::escrow_service::{EscrowConfig, EscrowState};
use taskpay::services::{EscrowService, TransactionService, WalletService};
use taskpay::store::memory::{MemoryTransactionStore, MemoryWalletStore};

struct Harness {
    wallets: WalletService,
    transactions: TransactionService,
    escrow: EscrowService,
}

fn harness() -> Harness {
    let wallets = WalletService::new(Arc::new(MemoryWalletStore::new()));
    let transactions = TransactionService::new(Arc::new(MemoryTransactionStore::new()));
    let escrow = EscrowService::new(
        wallets.clone(),
        transactions.clone(),
        EscrowConfig::default(),
    );
    Harness {
        wallets,
        transactions,
        escrow,
    }
}

impl Harness {
    async fn wallet_with(&self, balance: Decimal) -> Wallet {
        self.wallets
            .create_wallet(Uuid::new_v4(), Currency::Usd, balance)
            .await
            .unwrap()
    }

    async fn wallet(&self, id: Uuid) -> Wallet {
        self.wallets.get_wallet(id).await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn hold_moves_amount_plus_fee_into_escrow() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    let receipt = h
        .escrow
        .hold_funds("task-1", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    assert_eq!(receipt.platform_fee, dec!(5.00));
    assert_eq!(receipt.total_amount, dec!(105.00));
    assert_eq!(receipt.status, EscrowState::Held);

    let payer = h.wallet(payer.id).await;
    assert_eq!(payer.balance, dec!(395.00));
    assert_eq!(payer.escrow_balance, dec!(105.00));

    let status = h.escrow.get_escrow_status("task-1").await.unwrap().unwrap();
    assert_eq!(status.status, EscrowState::Held);
    assert_eq!(status.total_amount, dec!(105.00));
    assert_eq!(status.transaction_id, receipt.transaction_id);

    // The hold transaction is pending and carries the escrow metadata.
    let hold = h
        .transactions
        .get_transaction(receipt.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.status, TransactionStatus::Pending);
    assert_eq!(hold.kind, TransactionKind::Payment);
    assert_eq!(hold.amount, dec!(105.00));
}

#[tokio::test]
async fn hold_with_insufficient_balance_leaves_wallet_untouched() {
    let h = harness();
    let payer = h.wallet_with(dec!(50.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    let err = h
        .escrow
        .hold_funds("task-2", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds));

    let payer = h.wallet(payer.id).await;
    assert_eq!(payer.balance, dec!(50.00));
    assert_eq!(payer.escrow_balance, Decimal::ZERO);
    assert!(h.escrow.get_escrow_status("task-2").await.unwrap().is_none());
}

#[tokio::test]
async fn hold_rejects_missing_wallets_and_bad_percentages() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    let err = h
        .escrow
        .hold_funds("task-3", Uuid::new_v4(), payee.id, dec!(10), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WalletNotFound));

    let err = h
        .escrow
        .hold_funds("task-3", payer.id, payee.id, dec!(10), dec!(1.5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = h
        .escrow
        .hold_funds("task-3", payer.id, payee.id, Decimal::ZERO, dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn release_pays_payee_base_amount_and_platform_keeps_fee() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    h.escrow
        .hold_funds("task-4", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    let receipt = h
        .escrow
        .release_funds("task-4", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();
    assert_eq!(receipt.status, EscrowState::Released);
    assert_eq!(receipt.amount, dec!(100.00));
    assert_eq!(receipt.total_amount, dec!(105.00));

    let payer = h.wallet(payer.id).await;
    let payee = h.wallet(payee.id).await;
    assert_eq!(payer.balance, dec!(395.00));
    assert_eq!(payer.escrow_balance, Decimal::ZERO);
    assert_eq!(payee.balance, dec!(100.00));

    // Money conservation: what left the payer is the payee's credit plus
    // the retained platform fee.
    assert_eq!(
        dec!(500.00) - payer.total_balance(),
        payee.total_balance() + dec!(5.00)
    );

    let status = h.escrow.get_escrow_status("task-4").await.unwrap().unwrap();
    assert_eq!(status.status, EscrowState::Released);

    // Audit trail: payer payment and payee receipt, both completed.
    let payer_tx = h
        .transactions
        .get_transaction(receipt.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payer_tx.status, TransactionStatus::Completed);
    assert_eq!(payer_tx.amount, dec!(105.00));

    let (receipts, total) = {
        let page = h
            .transactions
            .list_transactions(
                TransactionFilter {
                    wallet_id: Some(payee.id),
                    kind: Some(TransactionKind::Deposit),
                    status: None,
                },
                1,
                10,
            )
            .await
            .unwrap();
        (page.transactions, page.total)
    };
    assert_eq!(total, 1);
    assert_eq!(receipts[0].amount, dec!(100.00));
    assert_eq!(receipts[0].status, TransactionStatus::Completed);
}

#[tokio::test]
async fn release_rejects_amounts_that_do_not_match_the_hold() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    h.escrow
        .hold_funds("task-5", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    // Different base amount than was held
    let err = h
        .escrow
        .release_funds("task-5", payer.id, payee.id, dec!(90.00), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Different fee percentage than was held
    let err = h
        .escrow
        .release_funds("task-5", payer.id, payee.id, dec!(100.00), dec!(0.10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Nothing moved
    let payer = h.wallet(payer.id).await;
    assert_eq!(payer.balance, dec!(395.00));
    assert_eq!(payer.escrow_balance, dec!(105.00));
}

#[tokio::test]
async fn release_without_a_hold_is_not_found() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    let err = h
        .escrow
        .release_funds("task-6", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EscrowNotFound(_)));
}

#[tokio::test]
async fn releasing_twice_conflicts() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    h.escrow
        .hold_funds("task-7", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();
    h.escrow
        .release_funds("task-7", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    let err = h
        .escrow
        .release_funds("task-7", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
}

#[tokio::test]
async fn failed_payee_credit_rolls_the_payer_back_exactly() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    h.escrow
        .hold_funds("task-8", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    // Step C (payee credit) will fail: crediting a suspended wallet is
    // refused. Steps A and B succeed first, then get compensated.
    h.wallets.suspend_wallet(payee.id).await.unwrap();

    let err = h
        .escrow
        .release_funds("task-8", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Full rollback: payer balances are exactly the post-hold values.
    let payer_after = h.wallet(payer.id).await;
    assert_eq!(payer_after.balance, dec!(395.00));
    assert_eq!(payer_after.escrow_balance, dec!(105.00));
    let payee_after = h.wallet(payee.id).await;
    assert_eq!(payee_after.balance, Decimal::ZERO);

    // The escrow is still held and releasable once the payee recovers.
    let status = h.escrow.get_escrow_status("task-8").await.unwrap().unwrap();
    assert_eq!(status.status, EscrowState::Held);

    h.wallets.activate_wallet(payee.id).await.unwrap();
    h.escrow
        .release_funds("task-8", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();
    assert_eq!(h.wallet(payee.id).await.balance, dec!(100.00));
}

#[tokio::test]
async fn failed_payer_deduction_restores_the_escrow_hold() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    h.escrow
        .hold_funds("task-9", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    // Step B (deduct) will fail on the suspended payer; step A's escrow
    // release gets re-applied.
    h.wallets.suspend_wallet(payer.id).await.unwrap();

    let err = h
        .escrow
        .release_funds("task-9", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let payer_after = h.wallet(payer.id).await;
    assert_eq!(payer_after.balance, dec!(395.00));
    assert_eq!(payer_after.escrow_balance, dec!(105.00));
    assert_eq!(h.wallet(payee.id).await.balance, Decimal::ZERO);
}

#[tokio::test]
async fn refund_returns_amount_plus_fee_to_the_payer() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    h.escrow
        .hold_funds("task-10", payer.id, payee.id, dec!(100.00), dec!(0.05))
        .await
        .unwrap();

    let receipt = h.escrow.refund_funds("task-10", payer.id).await.unwrap();
    assert_eq!(receipt.status, EscrowState::Refunded);
    assert_eq!(receipt.total_amount, dec!(105.00));

    // Money conservation: the payer ends exactly where it started.
    let payer = h.wallet(payer.id).await;
    assert_eq!(payer.balance, dec!(500.00));
    assert_eq!(payer.escrow_balance, Decimal::ZERO);
    assert_eq!(h.wallet(payee.id).await.balance, Decimal::ZERO);

    let status = h
        .escrow
        .get_escrow_status("task-10")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.status, EscrowState::Refunded);

    // The refund itself is on the audit trail.
    let refund = h
        .transactions
        .get_transaction(receipt.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refund.kind, TransactionKind::Refund);
    assert_eq!(refund.status, TransactionStatus::Completed);
    assert_eq!(refund.amount, dec!(105.00));
}

#[tokio::test]
async fn fee_rounding_keeps_scale_4() {
    let h = harness();
    let payer = h.wallet_with(dec!(500.00)).await;
    let payee = h.wallet_with(Decimal::ZERO).await;

    // 33.3333 * 0.0775 = 2.58333... -> rounds to 2.5833
    let receipt = h
        .escrow
        .hold_funds("task-11", payer.id, payee.id, dec!(33.3333), dec!(0.0775))
        .await
        .unwrap();
    assert_eq!(receipt.platform_fee, dec!(2.5833));
    assert_eq!(receipt.total_amount, dec!(35.9166));

    let payer = h.wallet(payer.id).await;
    assert_eq!(payer.escrow_balance, dec!(35.9166));
}
