//! Payment endpoints: range statement, allocation and history.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Payment, PaymentOutcome, RangeStatement};
use crate::services::record_receipt_failure;
use crate::startup::AppState;
use crate::utils::dates::parse_required_date;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub from_date: String,
    pub to_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub payment_mode: Option<String>,
    pub from_date: String,
    pub to_date: String,
}

/// Entries and totals for the requested range — the data a client inspects
/// before deciding how much to pay. Pure read, safe to repeat.
pub async fn entries_for_payment(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<RangeStatement>, AppError> {
    let from = parse_required_date(&range.from_date)?;
    let to = parse_required_date(&range.to_date)?;

    let statement = state.db.range_statement(customer_id, from, to).await?;
    Ok(Json(statement))
}

/// Apply a payment across the range and hand back the payment id plus the
/// best-effort receipt. A receipt failure downgrades to a warning; the
/// committed payment stands.
pub async fn make_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentRequest>,
) -> Result<Json<PaymentOutcome>, AppError> {
    let from = parse_required_date(&payload.from_date)?;
    let to = parse_required_date(&payload.to_date)?;

    let (payment, customer, entries) = state
        .db
        .record_payment(
            payload.customer_id,
            payload.amount,
            payload.payment_mode.as_deref(),
            from,
            to,
        )
        .await?;

    let outcome = match state
        .receipts
        .write_receipt(&customer, &entries, &payment)
        .await
    {
        Ok(artifact) => PaymentOutcome {
            payment_id: payment.payment_id,
            receipt_url: Some(artifact.url),
            receipt_warning: None,
        },
        Err(e) => {
            tracing::warn!(
                payment_id = %payment.payment_id,
                error = %e,
                "Payment committed but receipt rendering failed"
            );
            record_receipt_failure("render");
            PaymentOutcome {
                payment_id: payment.payment_id,
                receipt_url: None,
                receipt_warning: Some(format!("receipt generation failed: {}", e)),
            }
        }
    };

    Ok(Json(outcome))
}

pub async fn payment_history(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state.db.list_payments(customer_id).await?;
    Ok(Json(payments))
}

/// Remove a payment record. The entry allocations it made stay on the
/// ledger — deletion is bookkeeping, not a refund.
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.db.delete_payment(payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
