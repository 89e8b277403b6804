//! Wallet management HTTP handlers.
//!
//! - POST /api/v1/wallets - Create a wallet for a user
//! - GET  /api/v1/wallets/:id - Get wallet by id
//! - GET  /api/v1/users/:user_id/wallet - Get a user's wallet
//! - POST /api/v1/wallets/:id/suspend | /activate | /close - Lifecycle

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    models::wallet::{CreateWalletRequest, WalletResponse},
};

/// Create a new wallet.
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "currency": "USD",
///   "initial_balance": "100.0000"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: Returns the created wallet
/// - **Error (400)**: A wallet already exists for the user, or the initial
///   balance is invalid
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), AppError> {
    let wallet = state
        .wallets
        .create_wallet(request.user_id, request.currency, request.initial_balance)
        .await?;

    Ok((StatusCode::CREATED, Json(wallet.into())))
}

/// Get a wallet by id.
///
/// # Response
///
/// - **Success (200 OK)**: Returns wallet details
/// - **Error (404)**: Wallet not found
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state
        .wallets
        .get_wallet(wallet_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;

    Ok(Json(wallet.into()))
}

/// Get the wallet belonging to a user.
pub async fn get_wallet_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state
        .wallets
        .get_wallet_by_user_id(user_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;

    Ok(Json(wallet.into()))
}

/// Suspend a wallet. Spending is refused while suspended.
pub async fn suspend_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.wallets.suspend_wallet(wallet_id).await?;
    Ok(Json(wallet.into()))
}

/// Reactivate a suspended wallet.
pub async fn activate_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.wallets.activate_wallet(wallet_id).await?;
    Ok(Json(wallet.into()))
}

/// Close a wallet permanently. Both balances must be zero.
pub async fn close_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.wallets.close_wallet(wallet_id).await?;
    Ok(Json(wallet.into()))
}
