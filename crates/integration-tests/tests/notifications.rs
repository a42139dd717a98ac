//! Broadcasts and the per-user notification inbox.
//!
//! Requires a running server and its database; see the crate docs.

use reqwest::{Client, StatusCode};
use serde_json::json;
use solarshop_integration_tests::{
    admin_session, base_url, expect_json, pool, signup_and_login, unique_sku,
};
use sqlx::PgPool;

async fn broadcast(admin: &Client, title: &str, audience: &str) -> i64 {
    let resp = admin
        .post(format!("{}/api/admin/notifications/broadcast", base_url()))
        .json(&json!({
            "title": title,
            "message": "Grid outage expected in Nairobi West, solar stock is limited.",
            "audience": audience,
        }))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await["recipients"]
        .as_i64()
        .unwrap()
}

/// Rows written for a title, split into (customers, admins).
async fn recipients_by_role(pool: &PgPool, title: &str) -> (i64, i64) {
    sqlx::query_as(
        r"
        SELECT COUNT(*) FILTER (WHERE u.role = 'customer'),
               COUNT(*) FILTER (WHERE u.role = 'admin')
        FROM notifications n JOIN users u ON u.id = n.user_id
        WHERE n.kind = 'broadcast' AND n.title = $1
        ",
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn inbox_has(client: &Client, title: &str) -> bool {
    let resp = client
        .get(format!("{}/api/notifications", base_url()))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == title)
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_broadcast_reaches_each_audience() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "inbox").await;

    let title = format!("Customers {}", unique_sku("B"));
    let sent = broadcast(&admin.client, &title, "customers").await;
    let (customers, admins) = recipients_by_role(&pool, &title).await;
    assert_eq!(sent, customers);
    assert_eq!(admins, 0);
    assert!(inbox_has(&customer.client, &title).await);
    assert!(!inbox_has(&admin.client, &title).await);

    let title = format!("Admins {}", unique_sku("B"));
    let sent = broadcast(&admin.client, &title, "admins").await;
    let (customers, admins) = recipients_by_role(&pool, &title).await;
    assert_eq!(sent, admins);
    assert_eq!(customers, 0);
    assert!(inbox_has(&admin.client, &title).await);
    assert!(!inbox_has(&customer.client, &title).await);

    let title = format!("Everyone {}", unique_sku("B"));
    let sent = broadcast(&admin.client, &title, "all").await;
    let (customers, admins) = recipients_by_role(&pool, &title).await;
    assert_eq!(sent, customers + admins);
    assert!(customers >= 1 && admins >= 1);
    assert!(inbox_has(&admin.client, &title).await);
    assert!(inbox_has(&customer.client, &title).await);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_broadcast_requires_admin_and_text() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "nobroadcast").await;

    let resp = customer
        .client
        .post(format!("{}/api/admin/notifications/broadcast", base_url()))
        .json(&json!({ "title": "Hello", "message": "Hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = admin
        .client
        .post(format!("{}/api/admin/notifications/broadcast", base_url()))
        .json(&json!({ "title": "  ", "message": "Hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
