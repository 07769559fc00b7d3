//! Entry model: a single dated weighed-goods transaction for a customer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Settlement state derived from an entry's remaining balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl SettlementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Unpaid => "unpaid",
            SettlementState::PartiallyPaid => "partially_paid",
            SettlementState::Paid => "paid",
        }
    }
}

impl std::fmt::Display for SettlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amount owed for a weighed quantity after commission, before payments.
/// Commission is a quantity deduction; a commission larger than the weighed
/// quantity yields a negative amount, which is accepted input.
pub fn compute_amount(kgs: Decimal, rate: Decimal, commission: Decimal) -> Decimal {
    (kgs - commission) * rate
}

/// Single ledger entry.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: Uuid,
    pub customer_id: Uuid,
    pub entry_date: NaiveDate,
    pub item_name: Option<String>,
    pub bags: i32,
    pub kgs: Decimal,
    pub rate: Decimal,
    pub commission: Decimal,
    /// Stored cache of the computed amount. Readers recompute from the
    /// quantity fields instead of trusting this column.
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub posted_utc: DateTime<Utc>,
}

impl Entry {
    /// Amount recomputed from current quantity fields.
    pub fn computed_amount(&self) -> Decimal {
        compute_amount(self.kgs, self.rate, self.commission)
    }

    /// Signed outstanding balance; negative when overpaid.
    pub fn outstanding(&self) -> Decimal {
        self.computed_amount() - self.paid_amount
    }

    /// Unpaid portion floored at zero for display.
    pub fn remaining(&self) -> Decimal {
        self.outstanding().max(Decimal::ZERO)
    }

    pub fn settlement_state(&self) -> SettlementState {
        if self.remaining() <= Decimal::ZERO {
            SettlementState::Paid
        } else if self.paid_amount > Decimal::ZERO {
            SettlementState::PartiallyPaid
        } else {
            SettlementState::Unpaid
        }
    }
}

/// Read view of an entry: amount and remaining recomputed from the current
/// quantity fields, never the stored amount column.
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub entry_id: Uuid,
    pub customer_id: Uuid,
    pub entry_date: NaiveDate,
    pub item_name: Option<String>,
    pub bags: i32,
    pub kgs: Decimal,
    pub rate: Decimal,
    pub commission: Decimal,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining: Decimal,
    pub state: SettlementState,
    pub posted_utc: DateTime<Utc>,
}

impl From<Entry> for EntryView {
    fn from(entry: Entry) -> Self {
        let amount = entry.computed_amount();
        let remaining = entry.remaining();
        let state = entry.settlement_state();
        Self {
            entry_id: entry.entry_id,
            customer_id: entry.customer_id,
            entry_date: entry.entry_date,
            item_name: entry.item_name,
            bags: entry.bags,
            kgs: entry.kgs,
            rate: entry.rate,
            commission: entry.commission,
            amount,
            paid_amount: entry.paid_amount,
            remaining,
            state,
            posted_utc: entry.posted_utc,
        }
    }
}

/// Input for persisting a new entry. Dates are parsed and quantities
/// sign-checked by the caller; `paid_amount` always starts at zero.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub customer_id: Uuid,
    pub entry_date: NaiveDate,
    pub item_name: Option<String>,
    pub bags: i32,
    pub kgs: Decimal,
    pub rate: Decimal,
    pub commission: Decimal,
}

/// Partial entry update; unset fields retain their stored values. Supplying
/// `paid_amount` overwrites it (the manual-correction path), otherwise the
/// prior value is kept while the amount is recomputed from merged fields.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub entry_date: Option<NaiveDate>,
    pub item_name: Option<String>,
    pub bags: Option<i32>,
    pub kgs: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
}
