//! Services module for billing-service.

pub mod allocation;
pub mod database;
pub mod metrics;
pub mod receipt;

pub use allocation::{plan_allocation, Allocation, AllocationPlan};
pub use database::Database;
pub use metrics::{
    get_metrics, init_metrics, record_customer_operation, record_entry_operation, record_payment,
    record_receipt_failure,
};
pub use receipt::{ReceiptArtifact, ReceiptWriter};
