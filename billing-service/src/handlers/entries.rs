//! Ledger entry endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Entry, EntryPatch, EntryView, NewEntry};
use crate::services::record_entry_operation;
use crate::startup::AppState;
use crate::utils::dates::parse_required_date;

/// Wire payload for creating an entry. Dates arrive as text in whatever
/// format the client produced.
#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    #[serde(rename = "customerId")]
    pub customer_id: Uuid,
    pub entry_date: String,
    pub item_name: Option<String>,
    pub bags: Option<i32>,
    pub kgs: Decimal,
    pub rate: Decimal,
    pub commission: Option<Decimal>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateEntryRequest {
    pub entry_date: Option<String>,
    pub item_name: Option<String>,
    pub bags: Option<i32>,
    pub kgs: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
}

fn check_non_negative(field: &'static str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(field, "must be non-negative"));
    }
    Ok(())
}

pub async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<EntryView>), AppError> {
    let entry_date = parse_required_date(&payload.entry_date)?;
    let commission = payload.commission.unwrap_or(Decimal::ZERO);

    check_non_negative("kgs", payload.kgs)?;
    check_non_negative("rate", payload.rate)?;
    check_non_negative("commission", commission)?;

    let entry = state
        .db
        .create_entry(&NewEntry {
            customer_id: payload.customer_id,
            entry_date,
            item_name: payload.item_name,
            bags: payload.bags.unwrap_or(0),
            kgs: payload.kgs,
            rate: payload.rate,
            commission,
        })
        .await?;

    record_entry_operation("create");
    Ok((StatusCode::CREATED, Json(entry.into())))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<EntryView>>, AppError> {
    let entries = state.db.list_entries(customer_id).await?;
    Ok(Json(entries.into_iter().map(EntryView::from).collect()))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<UpdateEntryRequest>,
) -> Result<Json<EntryView>, AppError> {
    let entry_date = payload
        .entry_date
        .as_deref()
        .map(parse_required_date)
        .transpose()?;

    for (field, value) in [
        ("kgs", payload.kgs),
        ("rate", payload.rate),
        ("commission", payload.commission),
    ] {
        if let Some(value) = value {
            check_non_negative(field, value)?;
        }
    }

    let patch = EntryPatch {
        entry_date,
        item_name: payload.item_name,
        bags: payload.bags,
        kgs: payload.kgs,
        rate: payload.rate,
        commission: payload.commission,
        paid_amount: payload.paid_amount,
    };

    let entry: Entry = state.db.update_entry(entry_id, &patch).await?;
    record_entry_operation("update");
    Ok(Json(entry.into()))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.db.delete_entry(entry_id).await?;
    record_entry_operation("delete");
    Ok(StatusCode::NO_CONTENT)
}
