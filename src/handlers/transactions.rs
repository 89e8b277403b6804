//! Transaction query HTTP handlers.
//!
//! - GET /api/v1/transactions - Paginated listing with filters
//! - GET /api/v1/transactions/:id - Get transaction details

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    models::transaction::{
        TransactionFilter, TransactionKind, TransactionResponse, TransactionStatus,
    },
    services::transaction_service::DEFAULT_PAGE_SIZE,
};

/// Query parameters for the transaction listing.
///
/// All filters are optional; out-of-range pagination values are clamped
/// rather than rejected.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub wallet_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,

    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Response body for the transaction listing.
///
/// # JSON Example
///
/// ```json
/// {
///   "transactions": [ ... ],
///   "total": 42,
///   "page": 1,
///   "page_size": 20,
///   "total_pages": 3
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// List transactions, newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let filter = TransactionFilter {
        wallet_id: query.wallet_id,
        kind: query.kind,
        status: query.status,
    };

    let page = state
        .transactions
        .list_transactions(filter, query.page, query.page_size)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: page.transactions.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
    }))
}

/// Get a transaction by id.
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state
        .transactions
        .get_transaction(transaction_id)
        .await?
        .ok_or(AppError::TransactionNotFound)?;

    Ok(Json(transaction.into()))
}
