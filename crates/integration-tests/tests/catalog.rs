//! Public catalog browsing and the review moderation loop.
//!
//! Requires a running server and its database; see the crate docs.

use reqwest::StatusCode;
use serde_json::json;
use solarshop_integration_tests::{
    admin_session, base_url, client, create_product, expect_json, pool, signup_and_login,
};

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_active_product_is_public() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "12500.00", 10).await;
    let slug = product["slug"].as_str().unwrap();

    let resp = client()
        .get(format!("{}/api/products/{slug}", base_url()))
        .send()
        .await
        .unwrap();
    let detail = expect_json(resp, StatusCode::OK).await;
    assert_eq!(detail["sku"], product["sku"]);
    assert_eq!(detail["stock_quantity"], 10);
    assert_eq!(detail["reviews"]["count"], 0);

    let resp = client()
        .get(format!("{}/api/products", base_url()))
        .query(&[("q", product["sku"].as_str().unwrap())])
        .send()
        .await
        .unwrap();
    let page = expect_json(resp, StatusCode::OK).await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_archived_product_is_hidden() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let product = create_product(&admin.client, "999.00", 1).await;
    let id = product["id"].as_i64().unwrap();
    let slug = product["slug"].as_str().unwrap();

    let resp = admin
        .client
        .delete(format!("{}/api/admin/products/{id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client()
        .get(format!("{}/api/products/{slug}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_review_needs_approval() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "reviewer").await;
    let product = create_product(&admin.client, "4500.00", 5).await;
    let id = product["id"].as_i64().unwrap();

    let resp = customer
        .client
        .post(format!("{}/api/products/{id}/reviews", base_url()))
        .json(&json!({ "rating": 4, "title": "Solid", "body": "Charges fast in full sun." }))
        .send()
        .await
        .unwrap();
    let review = expect_json(resp, StatusCode::CREATED).await;
    assert_eq!(review["verified_purchase"], false);
    let review_id = review["id"].as_i64().unwrap();

    let resp = client()
        .get(format!("{}/api/products/{id}/reviews", base_url()))
        .send()
        .await
        .unwrap();
    let listed = expect_json(resp, StatusCode::OK).await;
    assert_eq!(listed["summary"]["count"], 0);

    let resp = admin
        .client
        .put(format!("{}/api/admin/reviews/{review_id}/approve", base_url()))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = client()
        .get(format!("{}/api/products/{id}/reviews", base_url()))
        .send()
        .await
        .unwrap();
    let listed = expect_json(resp, StatusCode::OK).await;
    assert_eq!(listed["summary"]["count"], 1);
    assert_eq!(listed["summary"]["distribution"][3], 1);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_invalid_rating_rejected() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "badrating").await;
    let product = create_product(&admin.client, "4500.00", 5).await;
    let id = product["id"].as_i64().unwrap();

    let resp = customer
        .client
        .post(format!("{}/api/products/{id}/reviews", base_url()))
        .json(&json!({ "rating": 6, "body": "Too good" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_customer_cannot_reach_admin() {
    let pool = pool().await;
    let customer = signup_and_login(&pool, "nosy").await;

    let resp = customer
        .client
        .get(format!("{}/api/admin/products", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
