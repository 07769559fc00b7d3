//! Customer model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A customer account. Entries and payments reference it; deleting the
/// customer cascades to both.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    /// External identifier handed out by the business ("C001", ...).
    pub serial: String,
    pub name: String,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for registering a new customer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomer {
    #[validate(length(min = 1, message = "serial is required"))]
    pub serial: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub phone: Option<String>,
}

/// Partial customer update; unset fields retain their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomer {
    pub serial: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}
