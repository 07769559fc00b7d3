//! Domain models for billing-service.

mod customer;
mod entry;
mod payment;

pub use customer::{CreateCustomer, Customer, UpdateCustomer};
pub use entry::{
    compute_amount, Entry, EntryPatch, EntryView, NewEntry, SettlementState,
};
pub use payment::{Payment, PaymentOutcome, RangeStatement, RangeTotals};
