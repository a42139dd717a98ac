//! Stock movement ledger, stock-take, the balance audit and the admin
//! order lifecycle.
//!
//! Requires a running server and its database; see the crate docs.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use solarshop_integration_tests::{
    admin_session, base_url, create_address, create_product, expect_json, pool, signup_and_login,
};

async fn record(admin: &Client, body: &Value) -> reqwest::Response {
    admin
        .post(format!("{}/api/admin/inventory/movements", base_url()))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_movements_chain_balances() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "7000.00", 10).await;
    let id = product["id"].as_i64().unwrap();

    let resp = record(
        &admin.client,
        &json!({
            "product_id": id,
            "movement_type": "purchase",
            "quantity": 15,
            "reference": "INV-2024-118",
        }),
    )
    .await;
    let purchase = expect_json(resp, StatusCode::CREATED).await;
    assert_eq!(purchase["quantity_before"], 10);
    assert_eq!(purchase["quantity_after"], 25);
    assert!(purchase["note"].as_str().unwrap().contains("INV-2024-118"));

    let resp = record(
        &admin.client,
        &json!({ "product_id": id, "movement_type": "adjustment", "quantity": -4, "note": "Damaged" }),
    )
    .await;
    let adjustment = expect_json(resp, StatusCode::CREATED).await;
    assert_eq!(adjustment["quantity_before"], 25);
    assert_eq!(adjustment["quantity_after"], 21);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_balance_cannot_go_negative() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "7000.00", 2).await;
    let id = product["id"].as_i64().unwrap();

    let resp = record(
        &admin.client,
        &json!({ "product_id": id, "movement_type": "adjustment", "quantity": -3 }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = record(
        &admin.client,
        &json!({ "product_id": id, "movement_type": "purchase", "quantity": 0 }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_stock_take_adjusts_to_count() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "450.00", 30).await;
    let id = product["id"].as_i64().unwrap();

    let resp = admin
        .client
        .post(format!("{}/api/admin/inventory/stock-take", base_url()))
        .json(&json!({ "product_id": id, "counted_quantity": 27, "note": "Quarterly count" }))
        .send()
        .await
        .unwrap();
    let result = expect_json(resp, StatusCode::OK).await;
    assert_eq!(result["previous_quantity"], 30);
    assert_eq!(result["counted_quantity"], 27);
    assert_eq!(result["movement"]["movement_type"], "adjustment");
    assert_eq!(result["movement"]["quantity"], -3);

    // Counting the same number again records nothing.
    let resp = admin
        .client
        .post(format!("{}/api/admin/inventory/stock-take", base_url()))
        .json(&json!({ "product_id": id, "counted_quantity": 27 }))
        .send()
        .await
        .unwrap();
    let result = expect_json(resp, StatusCode::OK).await;
    assert!(result["movement"].is_null());
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_low_stock_and_audit() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "150.00", 1).await;
    let id = product["id"].as_i64().unwrap();

    let resp = admin
        .client
        .get(format!("{}/api/admin/inventory/low-stock", base_url()))
        .send()
        .await
        .unwrap();
    let report = expect_json(resp, StatusCode::OK).await;
    assert!(report["threshold"].as_i64().unwrap() >= 1);
    assert!(
        report["products"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == id)
    );

    // Writing the balance directly bypasses the ledger; the audit notices.
    sqlx::query("UPDATE products SET stock_quantity = stock_quantity + 5 WHERE id = $1")
        .bind(i32::try_from(id).unwrap())
        .execute(&pool)
        .await
        .unwrap();

    let resp = admin
        .client
        .get(format!("{}/api/admin/inventory/audit", base_url()))
        .send()
        .await
        .unwrap();
    let audit = expect_json(resp, StatusCode::OK).await;
    assert_eq!(audit["consistent"], false);
    assert!(
        audit["discrepancies"]
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d["product_id"] == id)
    );

    // Put it back so later audits stay clean.
    sqlx::query("UPDATE products SET stock_quantity = stock_quantity - 5 WHERE id = $1")
        .bind(i32::try_from(id).unwrap())
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_order_status_lifecycle() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "lifecycle").await;
    let product = create_product(&admin.client, "5200.00", 3).await;
    let address = create_address(&customer.client).await;

    let resp = customer
        .client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": product["id"], "quantity": 1 }))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await;
    let resp = customer
        .client
        .post(format!("{}/api/checkout", base_url()))
        .json(&json!({ "address_id": address["id"] }))
        .send()
        .await
        .unwrap();
    let order = expect_json(resp, StatusCode::CREATED).await;
    let order_id = order["id"].as_i64().unwrap();
    let status_url = format!("{}/api/admin/orders/{order_id}/status", base_url());

    let resp = admin
        .client
        .put(&status_url)
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    for next in ["processing", "shipped", "delivered"] {
        let resp = admin
            .client
            .put(&status_url)
            .json(&json!({ "status": next }))
            .send()
            .await
            .unwrap();
        let updated = expect_json(resp, StatusCode::OK).await;
        assert_eq!(updated["status"], next);
    }

    let resp = customer
        .client
        .get(format!("{}/api/notifications/unread-count", base_url()))
        .send()
        .await
        .unwrap();
    let unread = expect_json(resp, StatusCode::OK).await;
    assert!(unread["count"].as_i64().unwrap() >= 1);
}

/// Stock and ledger agree for one product, and the audit doesn't flag it.
async fn assert_ledger_matches(admin: &Client, pool: &sqlx::PgPool, product_id: i64, stock: i64) {
    let (balance, ledger): (i32, i64) = sqlx::query_as(
        r"
        SELECT p.stock_quantity,
               COALESCE((SELECT SUM(CASE WHEN m.movement_type = 'sale'
                                         THEN -m.quantity ELSE m.quantity END)
                         FROM stock_movements m WHERE m.product_id = p.id), 0)::BIGINT
        FROM products p WHERE p.id = $1
        ",
    )
    .bind(i32::try_from(product_id).unwrap())
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(i64::from(balance), stock);
    assert_eq!(ledger, stock);

    let resp = admin
        .get(format!("{}/api/admin/inventory/audit", base_url()))
        .send()
        .await
        .unwrap();
    let audit = expect_json(resp, StatusCode::OK).await;
    assert!(
        !audit["discrepancies"]
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d["product_id"] == product_id),
        "audit flagged product {product_id}: {audit}"
    );
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_concurrent_sales_never_oversell() {
    const STOCK: i32 = 3;
    const SALES: usize = 10;

    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "3200.00", STOCK).await;
    let id = product["id"].as_i64().unwrap();

    let mut sales = tokio::task::JoinSet::new();
    for n in 0..SALES {
        let client = admin.client.clone();
        sales.spawn(async move {
            record(
                &client,
                &json!({
                    "product_id": id,
                    "movement_type": "sale",
                    "quantity": 1,
                    "reference": format!("COUNTER-{n}"),
                }),
            )
            .await
            .status()
        });
    }
    let statuses = sales.join_all().await;

    let sold = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let refused = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(sold, usize::try_from(STOCK).unwrap(), "statuses: {statuses:?}");
    assert_eq!(refused, SALES - sold, "statuses: {statuses:?}");

    let resp = admin
        .client
        .get(format!("{}/api/admin/products/{id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(expect_json(resp, StatusCode::OK).await["stock_quantity"], 0);
    assert_ledger_matches(&admin.client, &pool, id, 0).await;
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_concurrent_checkouts_for_last_units() {
    const STOCK: i32 = 2;
    const BUYERS: usize = 5;

    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "950.00", STOCK).await;
    let id = product["id"].as_i64().unwrap();

    let mut buyers = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        let buyer = signup_and_login(&pool, "rush").await;
        let address = create_address(&buyer.client).await;
        let resp = buyer
            .client
            .post(format!("{}/api/cart/items", base_url()))
            .json(&json!({ "product_id": id, "quantity": 1 }))
            .send()
            .await
            .unwrap();
        expect_json(resp, StatusCode::OK).await;
        buyers.push((buyer.client, address["id"].clone()));
    }

    let mut checkouts = tokio::task::JoinSet::new();
    for (client, address_id) in buyers {
        checkouts.spawn(async move {
            client
                .post(format!("{}/api/checkout", base_url()))
                .json(&json!({ "address_id": address_id }))
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    let statuses = checkouts.join_all().await;

    let placed = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let refused = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(placed, usize::try_from(STOCK).unwrap(), "statuses: {statuses:?}");
    assert_eq!(refused, BUYERS - placed, "statuses: {statuses:?}");
    assert_ledger_matches(&admin.client, &pool, id, 0).await;
}
