//! Escrow protocol HTTP handlers.
//!
//! - POST /api/v1/escrow/hold - Hold funds for a task
//! - POST /api/v1/escrow/release - Release held funds to the payee
//! - POST /api/v1/escrow/refund - Return held funds to the payer
//! - GET  /api/v1/escrow/:task_id - Where a task's escrow currently stands
//!
//! These endpoints (plus the event dispatch in `handlers::events`) are the
//! entire escrow contract the outside world can call.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    services::escrow_service::{EscrowReceipt, EscrowStatus},
};

/// Request body for hold and release.
///
/// # JSON Example
///
/// ```json
/// {
///   "task_id": "task-7781",
///   "payer_wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "payee_wallet_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "100.00",
///   "platform_fee_percentage": "0.05"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct EscrowRequest {
    pub task_id: String,
    pub payer_wallet_id: Uuid,
    pub payee_wallet_id: Uuid,
    pub amount: Decimal,
    pub platform_fee_percentage: Decimal,
}

/// Request body for a refund.
#[derive(Debug, Deserialize)]
pub struct EscrowRefundRequest {
    pub task_id: String,
    pub payer_wallet_id: Uuid,
}

/// Hold funds (amount plus platform fee) in escrow for a task.
///
/// # Response
///
/// - **Success (200 OK)**: Receipt with `"status": "held"`
/// - **Error (404)**: Payer or payee wallet not found
/// - **Error (422)**: Payer balance below amount plus fee
pub async fn hold_funds(
    State(state): State<AppState>,
    Json(request): Json<EscrowRequest>,
) -> Result<Json<EscrowReceipt>, AppError> {
    let receipt = state
        .escrow
        .hold_funds(
            &request.task_id,
            request.payer_wallet_id,
            request.payee_wallet_id,
            request.amount,
            request.platform_fee_percentage,
        )
        .await?;

    Ok(Json(receipt))
}

/// Release a task's held funds to the payee.
///
/// The supplied amount and fee percentage must match what was held;
/// the hold transaction's metadata is the source of truth.
pub async fn release_funds(
    State(state): State<AppState>,
    Json(request): Json<EscrowRequest>,
) -> Result<Json<EscrowReceipt>, AppError> {
    let receipt = state
        .escrow
        .release_funds(
            &request.task_id,
            request.payer_wallet_id,
            request.payee_wallet_id,
            request.amount,
            request.platform_fee_percentage,
        )
        .await?;

    Ok(Json(receipt))
}

/// Return a task's held funds (amount plus fee) to the payer.
pub async fn refund_funds(
    State(state): State<AppState>,
    Json(request): Json<EscrowRefundRequest>,
) -> Result<Json<EscrowReceipt>, AppError> {
    let receipt = state
        .escrow
        .refund_funds(&request.task_id, request.payer_wallet_id)
        .await?;

    Ok(Json(receipt))
}

/// Where a task's escrow currently stands.
///
/// # Response
///
/// - **Success (200 OK)**: `{"task_id", "status", "transaction_id", "total_amount"}`
/// - **Error (404)**: No funds were ever held for the task
pub async fn get_escrow_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<EscrowStatus>, AppError> {
    let status = state
        .escrow
        .get_escrow_status(&task_id)
        .await?
        .ok_or_else(|| AppError::EscrowNotFound(task_id.clone()))?;

    Ok(Json(status))
}
