//! Range statement integration tests.
//!
//! Requires a PostgreSQL instance at TEST_DATABASE_URL.

mod common;

use common::{TestApp, dec, id_of};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn statement_includes_only_entries_inside_the_inclusive_range() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    app.create_entry(&customer_id, "2025-09-30", 10, 10, 0).await; // outside
    app.create_entry(&customer_id, "2025-10-01", 10, 12, 0).await; // boundary
    app.create_entry(&customer_id, "2025-10-15", 5, 10, 0).await;
    app.create_entry(&customer_id, "2025-10-31", 2, 10, 0).await; // boundary
    app.create_entry(&customer_id, "2025-11-01", 4, 10, 0).await; // outside

    let statement = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-31")
        .await;

    let entries = statement["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    // ascending allocation order
    assert_eq!(entries[0]["entry_date"], "2025-10-01");
    assert_eq!(entries[2]["entry_date"], "2025-10-31");

    // totals cover in-range entries only: 120 + 50 + 20
    assert_eq!(dec(&statement["totals"]["totalAmount"]), Decimal::from(190));
    assert_eq!(dec(&statement["totals"]["totalPaid"]), Decimal::ZERO);
    // outside: 100 + 40, nothing paid
    assert_eq!(
        dec(&statement["totals"]["remainingOutside"]),
        Decimal::from(140)
    );
}

#[tokio::test]
async fn amounts_are_recomputed_not_read_from_the_stored_column() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    let entry = app.create_entry(&customer_id, "2025-10-01", 10, 12, 0).await;
    let entry_id = id_of(&entry, "entry_id");

    // Corrupt the stored amount cache directly; the statement must not care.
    sqlx::query("UPDATE entries SET amount = 9999 WHERE entry_id = $1::uuid")
        .bind(&entry_id)
        .execute(app.db.pool())
        .await
        .unwrap();

    let statement = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-01")
        .await;
    assert_eq!(dec(&statement["entries"][0]["amount"]), Decimal::from(120));
    assert_eq!(dec(&statement["totals"]["totalAmount"]), Decimal::from(120));
}

#[tokio::test]
async fn total_paid_is_clamped_per_entry() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    // amount 100, manually overpaid to 130
    let overpaid = app.create_entry(&customer_id, "2025-10-01", 10, 10, 0).await;
    app.client
        .put(format!(
            "{}/api/entries/{}",
            app.address,
            id_of(&overpaid, "entry_id")
        ))
        .json(&json!({ "paid_amount": 130 }))
        .send()
        .await
        .unwrap();
    // amount 50, paid 0
    app.create_entry(&customer_id, "2025-10-02", 5, 10, 0).await;

    let statement = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-31")
        .await;

    assert_eq!(dec(&statement["totals"]["totalAmount"]), Decimal::from(150));
    // 130 clamps to 100; the overpayment does not inflate the aggregate
    assert_eq!(dec(&statement["totals"]["totalPaid"]), Decimal::from(100));
}

#[tokio::test]
async fn remaining_outside_clamps_overpaid_entries_at_zero() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    // outside the window: one overpaid (would be -30), one owing 40
    let overpaid = app.create_entry(&customer_id, "2025-09-01", 10, 10, 0).await;
    app.client
        .put(format!(
            "{}/api/entries/{}",
            app.address,
            id_of(&overpaid, "entry_id")
        ))
        .json(&json!({ "paid_amount": 130 }))
        .send()
        .await
        .unwrap();
    app.create_entry(&customer_id, "2025-09-02", 4, 10, 0).await;
    // inside the window
    app.create_entry(&customer_id, "2025-10-01", 10, 12, 0).await;

    let statement = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-31")
        .await;
    assert_eq!(
        dec(&statement["totals"]["remainingOutside"]),
        Decimal::from(40)
    );
}

#[tokio::test]
async fn statement_is_idempotent() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    app.create_entry(&customer_id, "2025-10-01", 10, 12, 0).await;
    app.create_entry(&customer_id, "2025-10-02", 5, 10, 0).await;

    let first = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-31")
        .await;
    let second = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-31")
        .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn flexible_date_formats_hit_the_same_window() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    app.create_entry(&customer_id, "2025-10-01", 10, 12, 0).await;

    let iso = app
        .range_statement(&customer_id, "2025-10-01", "2025-10-31")
        .await;
    let slashed = app
        .range_statement(&customer_id, "01/10/2025", "31/10/2025")
        .await;
    let dashed = app
        .range_statement(&customer_id, "01-10-2025", "31-10-2025")
        .await;

    assert_eq!(iso, slashed);
    assert_eq!(iso, dashed);
}

#[tokio::test]
async fn invalid_range_dates_are_rejected() {
    let app = TestApp::spawn().await;
    let customer = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&customer, "customer_id");

    let response = app
        .client
        .get(format!(
            "{}/api/payments/entries/{}",
            app.address, customer_id
        ))
        .query(&[("fromDate", "garbage"), ("toDate", "2025-10-31")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn statement_for_unknown_customer_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!(
            "{}/api/payments/entries/{}",
            app.address,
            uuid::Uuid::new_v4()
        ))
        .query(&[("fromDate", "2025-10-01"), ("toDate", "2025-10-31")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
