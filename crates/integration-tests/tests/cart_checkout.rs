//! Cart, checkout and customer cancellation, checked against the stock
//! ledger.
//!
//! Requires a running server and its database; see the crate docs.

use std::str::FromStr;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use solarshop_integration_tests::{
    admin_session, base_url, create_address, create_product, expect_json, pool, signup_and_login,
};

async fn add_to_cart(client: &Client, product_id: i64, quantity: i32) -> reqwest::Response {
    client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": product_id, "quantity": quantity }))
        .send()
        .await
        .unwrap()
}

async fn stock_of(admin: &Client, product_id: i64) -> i64 {
    let resp = admin
        .get(format!("{}/api/admin/products/{product_id}", base_url()))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await["stock_quantity"]
        .as_i64()
        .unwrap()
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_cart_merges_and_caps_at_stock() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "cart").await;
    let product = create_product(&admin.client, "1500.00", 5).await;
    let id = product["id"].as_i64().unwrap();

    expect_json(add_to_cart(&customer.client, id, 2).await, StatusCode::OK).await;
    let cart = expect_json(add_to_cart(&customer.client, id, 2).await, StatusCode::OK).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 4);
    assert_eq!(decimal(&cart["subtotal"]), Decimal::new(600_000, 2));

    let resp = add_to_cart(&customer.client, id, 2).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = customer
        .client
        .put(format!("{}/api/cart/items/{id}", base_url()))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    let cart = expect_json(resp, StatusCode::OK).await;
    assert_eq!(cart["item_count"], 0);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_checkout_records_sales_and_cancel_restocks() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "checkout").await;
    let product = create_product(&admin.client, "2500.00", 8).await;
    let id = product["id"].as_i64().unwrap();
    let address = create_address(&customer.client).await;

    expect_json(add_to_cart(&customer.client, id, 3).await, StatusCode::OK).await;

    let resp = customer
        .client
        .post(format!("{}/api/checkout", base_url()))
        .json(&json!({ "address_id": address["id"], "notes": "Gate B" }))
        .send()
        .await
        .unwrap();
    let order = expect_json(resp, StatusCode::CREATED).await;
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(decimal(&order["subtotal"]), Decimal::new(750_000, 2));
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(stock_of(&admin.client, id).await, 5);

    // The cart is emptied by checkout.
    let resp = customer
        .client
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(expect_json(resp, StatusCode::OK).await["item_count"], 0);

    let order_id = order["id"].as_i64().unwrap();
    let resp = customer
        .client
        .post(format!("{}/api/orders/{order_id}/cancel", base_url()))
        .send()
        .await
        .unwrap();
    let cancelled = expect_json(resp, StatusCode::OK).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(stock_of(&admin.client, id).await, 8);

    let resp = admin
        .client
        .get(format!("{}/api/admin/inventory/products/{id}/movements", base_url()))
        .send()
        .await
        .unwrap();
    let movements = expect_json(resp, StatusCode::OK).await;
    let kinds: Vec<&str> = movements
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["movement_type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"purchase"));
    assert!(kinds.contains(&"sale"));
    assert!(kinds.contains(&"return"));

    // A cancelled order stays cancelled.
    let resp = customer
        .client
        .post(format!("{}/api/orders/{order_id}/cancel", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_checkout_empty_cart_is_rejected() {
    let pool = pool().await;
    let customer = signup_and_login(&pool, "empty").await;
    let address = create_address(&customer.client).await;

    let resp = customer
        .client
        .post(format!("{}/api/checkout", base_url()))
        .json(&json!({ "address_id": address["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_orders_are_private() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let buyer = signup_and_login(&pool, "buyer").await;
    let other = signup_and_login(&pool, "other").await;
    let product = create_product(&admin.client, "300.00", 4).await;
    let address = create_address(&buyer.client).await;

    expect_json(
        add_to_cart(&buyer.client, product["id"].as_i64().unwrap(), 1).await,
        StatusCode::OK,
    )
    .await;
    let resp = buyer
        .client
        .post(format!("{}/api/checkout", base_url()))
        .json(&json!({ "address_id": address["id"] }))
        .send()
        .await
        .unwrap();
    let order = expect_json(resp, StatusCode::CREATED).await;
    let order_id = order["id"].as_i64().unwrap();

    let resp = other
        .client
        .get(format!("{}/api/orders/{order_id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
