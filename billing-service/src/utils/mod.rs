//! Shared helpers for billing-service.

pub mod dates;
