//! Payment model and range-statement views.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::entry::EntryView;

/// A recorded payment against a date range. Immutable once created;
/// deleting one does not reverse the entry allocations it made.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub customer_id: Uuid,
    /// The caller's original amount, even when part of it was absorbed
    /// beyond the range's outstanding total.
    pub amount: Decimal,
    pub mode: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub payment_date: DateTime<Utc>,
}

/// Aggregates for a range statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeTotals {
    pub total_amount: Decimal,
    /// Per-entry paid clamped to that entry's amount, so one overpaid entry
    /// cannot inflate the aggregate.
    pub total_paid: Decimal,
    /// Unpaid balance on entries outside the requested range, informational.
    pub remaining_outside: Decimal,
}

/// Entries intersecting a date range plus their aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct RangeStatement {
    pub entries: Vec<EntryView>,
    pub totals: RangeTotals,
}

/// Result of `pay`: the durable payment id plus the best-effort receipt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub payment_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    /// Present when the payment committed but the receipt could not be
    /// rendered; the financial transaction stands regardless.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_warning: Option<String>,
}
