//! Metrics module for billing-service.
//! Prometheus metrics for ledger operations and payment tracking.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "billing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Customer operations counter
pub static CUSTOMER_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Entry operations counter
pub static ENTRY_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Payments recorded counter
pub static PAYMENTS_RECORDED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Payment amount counter by mode (monetary tracking)
pub static PAYMENT_AMOUNT_TOTAL: OnceLock<prometheus::CounterVec> = OnceLock::new();

/// Receipt rendering failures (payments still commit)
pub static RECEIPT_FAILURES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    CUSTOMER_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_customer_operations_total",
                "Total customer operations by type"
            ),
            &["operation"]
        )
        .expect("Failed to register CUSTOMER_OPERATIONS_TOTAL")
    });

    ENTRY_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_entry_operations_total",
                "Total ledger entry operations by type"
            ),
            &["operation"]
        )
        .expect("Failed to register ENTRY_OPERATIONS_TOTAL")
    });

    PAYMENTS_RECORDED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_payments_recorded_total",
                "Total payments recorded by mode"
            ),
            &["mode"]
        )
        .expect("Failed to register PAYMENTS_RECORDED_TOTAL")
    });

    PAYMENT_AMOUNT_TOTAL.get_or_init(|| {
        prometheus::register_counter_vec!(
            prometheus::opts!(
                "billing_payment_amount_total",
                "Total payment amount by mode"
            ),
            &["mode"]
        )
        .expect("Failed to register PAYMENT_AMOUNT_TOTAL")
    });

    RECEIPT_FAILURES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_receipt_failures_total",
                "Receipts that failed to render after a committed payment"
            ),
            &["reason"]
        )
        .expect("Failed to register RECEIPT_FAILURES_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record a customer operation.
pub fn record_customer_operation(operation: &str) {
    if let Some(counter) = CUSTOMER_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}

/// Record a ledger entry operation.
pub fn record_entry_operation(operation: &str) {
    if let Some(counter) = ENTRY_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}

/// Record a payment and its amount.
pub fn record_payment(mode: &str, amount: f64) {
    if let Some(counter) = PAYMENTS_RECORDED_TOTAL.get() {
        counter.with_label_values(&[mode]).inc();
    }
    if let Some(counter) = PAYMENT_AMOUNT_TOTAL.get() {
        counter.with_label_values(&[mode]).inc_by(amount.abs());
    }
}

/// Record a receipt rendering failure.
pub fn record_receipt_failure(reason: &str) {
    if let Some(counter) = RECEIPT_FAILURES_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}
