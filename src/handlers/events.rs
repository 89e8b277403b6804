//! Inbound task-lifecycle event dispatch.
//!
//! The task service reports lifecycle changes here; the event kind decides
//! which escrow operation runs:
//!
//! - `task.completed` - logged only; funds stay held until verification
//! - `task.verified`  - release the held funds to the payee
//! - `task.rejected`  - refund the held funds to the payer
//! - `task.disputed`  - logged only; escrow is frozen pending review and no
//!   wallet is mutated

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::AppError, services::escrow_service::EscrowReceipt};

/// A task lifecycle event, tagged by its `event` field.
///
/// # JSON Example
///
/// ```json
/// {
///   "event": "task.verified",
///   "task_id": "task-7781",
///   "payer_wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "payee_wallet_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "100.00",
///   "platform_fee_percentage": "0.05"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
pub enum TaskEvent {
    #[serde(rename = "task.completed")]
    Completed { task_id: String },

    #[serde(rename = "task.verified")]
    Verified {
        task_id: String,
        payer_wallet_id: Uuid,
        payee_wallet_id: Uuid,
        amount: Decimal,
        /// Falls back to the configured default when absent
        platform_fee_percentage: Option<Decimal>,
    },

    #[serde(rename = "task.rejected")]
    Rejected {
        task_id: String,
        payer_wallet_id: Uuid,
    },

    #[serde(rename = "task.disputed")]
    Disputed { task_id: String },
}

/// What the event dispatch did.
#[derive(Debug, Serialize)]
pub struct EventOutcome {
    pub task_id: String,
    /// "released", "refunded" or "none"
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<EscrowReceipt>,
}

/// Dispatch one task lifecycle event.
pub async fn handle_task_event(
    State(state): State<AppState>,
    Json(event): Json<TaskEvent>,
) -> Result<Json<EventOutcome>, AppError> {
    let outcome = match event {
        TaskEvent::Completed { task_id } => {
            tracing::info!(%task_id, "task completed, escrow stays held until verification");
            EventOutcome {
                task_id,
                action: "none",
                receipt: None,
            }
        }
        TaskEvent::Verified {
            task_id,
            payer_wallet_id,
            payee_wallet_id,
            amount,
            platform_fee_percentage,
        } => {
            let fee_percentage = platform_fee_percentage
                .unwrap_or_else(|| state.escrow.default_platform_fee_percentage());
            let receipt = state
                .escrow
                .release_funds(
                    &task_id,
                    payer_wallet_id,
                    payee_wallet_id,
                    amount,
                    fee_percentage,
                )
                .await?;
            EventOutcome {
                task_id,
                action: "released",
                receipt: Some(receipt),
            }
        }
        TaskEvent::Rejected {
            task_id,
            payer_wallet_id,
        } => {
            let receipt = state
                .escrow
                .refund_funds(&task_id, payer_wallet_id)
                .await?;
            EventOutcome {
                task_id,
                action: "refunded",
                receipt: Some(receipt),
            }
        }
        TaskEvent::Disputed { task_id } => {
            tracing::warn!(%task_id, "task disputed, escrow frozen pending manual review");
            EventOutcome {
                task_id,
                action: "none",
                receipt: None,
            }
        }
    };

    Ok(Json(outcome))
}
