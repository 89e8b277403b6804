//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Every service-layer failure is one of these variants. Callers branch on
/// the variant, never on message text.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Resource Errors**: Wallet/transaction/escrow record not found
/// - **Business Logic Errors**: Insufficient balance, invalid state transitions
/// - **Validation Errors**: Invalid amounts, currencies, duplicate references
/// - **Compensation Errors**: A rollback step failed after a forward step
///   succeeded — the wallet state needs manual reconciliation
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested wallet does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Requested transaction does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// No escrow hold exists for the given task.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("No escrow found for task {0}")]
    EscrowNotFound(String),

    /// Available balance is below the amount the operation needs.
    ///
    /// Returns HTTP 422 Unprocessable Entity. Not transient; the caller must
    /// top up or reconcile, never retry as-is.
    #[error("Insufficient balance")]
    InsufficientFunds,

    /// Escrowed balance is below the amount the operation needs.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient escrow balance")]
    InsufficientEscrow,

    /// Request data violates a business rule (amount <= 0, bad fee
    /// percentage, duplicate reference, inactive wallet, ...).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state transition was attempted from an invalid source state,
    /// e.g. completing an already-failed transaction.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// A rollback step failed after a forward step had already committed.
    ///
    /// The wallet and transaction records are now inconsistent and require
    /// manual reconciliation. This must never be swallowed.
    #[error("Compensation failed: original error: {original}; compensation error: {compensation}")]
    CompensationFailed {
        original: Box<AppError>,
        compensation: Box<AppError>,
    },
}

/// Convert AppError into an HTTP response.
///
/// Allows handlers to return `Result<T, AppError>` and have errors
/// automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::WalletNotFound => {
                (StatusCode::NOT_FOUND, "wallet_not_found", self.to_string())
            }
            AppError::TransactionNotFound => (
                StatusCode::NOT_FOUND,
                "transaction_not_found",
                self.to_string(),
            ),
            AppError::EscrowNotFound(_) => {
                (StatusCode::NOT_FOUND, "escrow_not_found", self.to_string())
            }
            AppError::InsufficientFunds => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
                self.to_string(),
            ),
            AppError::InsufficientEscrow => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_escrow",
                self.to_string(),
            ),
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::StateConflict(ref msg) => {
                (StatusCode::CONFLICT, "state_conflict", msg.clone())
            }
            AppError::CompensationFailed { .. } => {
                tracing::error!(error = %self, "compensation failure, manual reconciliation required");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "compensation_failed",
                    "An internal inconsistency occurred".to_string(),
                )
            }
            AppError::Database(ref err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(status_of(AppError::WalletNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::TransactionNotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::EscrowNotFound("task-1".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn balance_errors_map_to_422() {
        assert_eq!(
            status_of(AppError::InsufficientFunds),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::InsufficientEscrow),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn validation_maps_to_400_and_state_conflict_to_409() {
        assert_eq!(
            status_of(AppError::Validation("Amount must be positive".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::StateConflict("already completed".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn compensation_failure_keeps_both_errors_in_message() {
        let err = AppError::CompensationFailed {
            original: Box::new(AppError::Validation("Wallet is not active".into())),
            compensation: Box::new(AppError::InsufficientFunds),
        };
        let msg = err.to_string();
        assert!(msg.contains("Wallet is not active"));
        assert!(msg.contains("Insufficient balance"));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
