//! Customer CRUD integration tests.
//!
//! Requires a PostgreSQL instance at TEST_DATABASE_URL.

mod common;

use common::{TestApp, id_of};
use serde_json::json;

#[tokio::test]
async fn create_and_get_customer() {
    let app = TestApp::spawn().await;

    let created = app.create_customer("C001", "Ramesh Kumar").await;
    assert_eq!(created["serial"], "C001");
    assert_eq!(created["name"], "Ramesh Kumar");

    let customer_id = id_of(&created, "customer_id");
    let response = app
        .client
        .get(format!("{}/api/customers/{}", app.address, customer_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let fetched: serde_json::Value = response.json().await.unwrap();
    assert_eq!(fetched["customer_id"], created["customer_id"]);
}

#[tokio::test]
async fn duplicate_serial_is_rejected() {
    let app = TestApp::spawn().await;

    app.create_customer("C001", "First").await;
    let response = app
        .client
        .post(format!("{}/api/customers", app.address))
        .json(&json!({ "serial": "C001", "name": "Second" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn missing_required_fields_fail_validation() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/api/customers", app.address))
        .json(&json!({ "serial": "", "name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn list_orders_by_serial_and_search_filters() {
    let app = TestApp::spawn().await;

    app.create_customer("C002", "Priya Sharma").await;
    app.create_customer("C001", "Ramesh Kumar").await;

    let response = app
        .client
        .get(format!("{}/api/customers", app.address))
        .send()
        .await
        .unwrap();
    let all: serde_json::Value = response.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["serial"], "C001");
    assert_eq!(all[1]["serial"], "C002");

    let response = app
        .client
        .get(format!("{}/api/customers", app.address))
        .query(&[("search", "priya")])
        .send()
        .await
        .unwrap();
    let filtered: serde_json::Value = response.json().await.unwrap();
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["name"], "Priya Sharma");
}

#[tokio::test]
async fn update_merges_over_stored_fields() {
    let app = TestApp::spawn().await;

    let created = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&created, "customer_id");

    let response = app
        .client
        .put(format!("{}/api/customers/{}", app.address, customer_id))
        .json(&json!({ "name": "Ramesh K" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "Ramesh K");
    // untouched fields survive
    assert_eq!(updated["serial"], "C001");
    assert_eq!(updated["phone"], "9876543210");
}

#[tokio::test]
async fn delete_cascades_to_entries_and_payments() {
    let app = TestApp::spawn().await;

    let created = app.create_customer("C001", "Ramesh Kumar").await;
    let customer_id = id_of(&created, "customer_id");
    app.create_entry(&customer_id, "2025-10-01", 10, 12, 0).await;
    let pay = app.pay(&customer_id, 50, "2025-10-01", "2025-10-31").await;
    assert_eq!(pay.status().as_u16(), 200);

    let response = app
        .client
        .delete(format!("{}/api/customers/{}", app.address, customer_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // everything referencing the customer is gone
    let entries = app.list_entries(&customer_id).await;
    assert!(entries.as_array().unwrap().is_empty());
    let history = app
        .client
        .get(format!(
            "{}/api/payments/history/{}",
            app.address, customer_id
        ))
        .send()
        .await
        .unwrap();
    let history: serde_json::Value = history.json().await.unwrap();
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!(
            "{}/api/customers/{}",
            app.address,
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
