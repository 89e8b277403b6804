//! Double-entry ledger HTTP handlers.
//!
//! - POST /api/v1/ledger/entries - Record a balanced debit/credit pair
//! - GET  /api/v1/ledger/transactions/:transaction_id/verify - Balance check
//! - GET  /api/v1/ledger/accounts/:account_type/balance - Account balance

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    models::ledger::{AccountType, LedgerEntry},
};

/// Request body for recording a double entry.
///
/// # JSON Example
///
/// ```json
/// {
///   "transaction_id": "770e8400-e29b-41d4-a716-446655440002",
///   "debit_account": "asset",
///   "credit_account": "liability",
///   "amount": "50.00",
///   "debit_balance_after": "150.00",
///   "credit_balance_after": "50.00",
///   "description": "Escrow funding"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DoubleEntryRequest {
    pub transaction_id: Uuid,
    pub debit_account: AccountType,
    pub credit_account: AccountType,
    pub amount: Decimal,
    pub debit_balance_after: Decimal,
    pub credit_balance_after: Decimal,
    pub description: Option<String>,
}

/// Response body for a recorded double entry.
#[derive(Debug, Serialize)]
pub struct DoubleEntryResponse {
    pub debit: LedgerEntry,
    pub credit: LedgerEntry,
}

/// Record one balanced debit/credit pair.
pub async fn create_double_entry(
    State(state): State<AppState>,
    Json(request): Json<DoubleEntryRequest>,
) -> Result<(StatusCode, Json<DoubleEntryResponse>), AppError> {
    let (debit, credit) = state
        .ledger
        .create_double_entry(
            request.transaction_id,
            request.debit_account,
            request.credit_account,
            request.amount,
            request.debit_balance_after,
            request.credit_balance_after,
            request.description,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DoubleEntryResponse { debit, credit })))
}

/// Response body for the balance verification endpoint.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub transaction_id: Uuid,
    /// True iff debit and credit sums are exactly equal
    pub balanced: bool,
}

/// Check the double-entry law for one transaction.
pub async fn verify_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<VerifyResponse>, AppError> {
    let balanced = state
        .ledger
        .verify_double_entry_balance(transaction_id)
        .await?;

    Ok(Json(VerifyResponse {
        transaction_id,
        balanced,
    }))
}

/// Response body for the account balance endpoint.
#[derive(Debug, Serialize)]
pub struct AccountBalanceResponse {
    pub account_type: AccountType,
    pub balance: Decimal,
}

/// Net balance of one account type under standard sign conventions.
pub async fn account_balance(
    State(state): State<AppState>,
    Path(account_type): Path<AccountType>,
) -> Result<Json<AccountBalanceResponse>, AppError> {
    let balance = state.ledger.calculate_account_balance(account_type).await?;

    Ok(Json(AccountBalanceResponse {
        account_type,
        balance,
    }))
}
