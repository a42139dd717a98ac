//! Quote requests: customer submission, admin pricing, customer answer.
//!
//! Requires a running server and its database; see the crate docs.

use reqwest::StatusCode;
use serde_json::json;
use solarshop_integration_tests::{
    admin_session, base_url, create_product, expect_json, pool, signup_and_login,
};

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_quote_round_trip() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "quote").await;
    let panel = create_product(&admin.client, "18500.00", 50).await;
    let inverter = create_product(&admin.client, "68000.00", 5).await;

    let resp = customer
        .client
        .post(format!("{}/api/quotes", base_url()))
        .json(&json!({
            "items": [
                { "product_id": panel["id"], "quantity": 6 },
                { "product_id": inverter["id"], "quantity": 1 },
                { "product_id": panel["id"], "quantity": 2 },
            ],
            "notes": "3 bedroom house in Machakos",
            "contact_phone": "+254 712 345 678",
            "installation_required": true,
        }))
        .send()
        .await
        .unwrap();
    let quote = expect_json(resp, StatusCode::CREATED).await;
    assert!(quote["quote_number"].as_str().unwrap().starts_with("Q-"));
    assert_eq!(quote["status"], "pending");
    assert_eq!(quote["items"].as_array().unwrap().len(), 2);
    assert_eq!(quote["contact_phone"], "254712345678");
    let quote_id = quote["id"].as_i64().unwrap();

    // Nothing to accept until an admin has priced it.
    let resp = customer
        .client
        .post(format!("{}/api/quotes/{quote_id}/accept", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = admin
        .client
        .put(format!("{}/api/admin/quotes/{quote_id}/respond", base_url()))
        .json(&json!({
            "quoted_total": "245000.00",
            "admin_notes": "Includes mounting and labour",
            "valid_days": 14,
        }))
        .send()
        .await
        .unwrap();
    let quoted = expect_json(resp, StatusCode::OK).await;
    assert_eq!(quoted["status"], "quoted");
    assert!(quoted["valid_until"].is_string());

    let resp = customer
        .client
        .post(format!("{}/api/quotes/{quote_id}/accept", base_url()))
        .send()
        .await
        .unwrap();
    let accepted = expect_json(resp, StatusCode::OK).await;
    assert_eq!(accepted["status"], "accepted");

    let resp = customer
        .client
        .get(format!("{}/api/notifications", base_url()))
        .send()
        .await
        .unwrap();
    let notifications = expect_json(resp, StatusCode::OK).await;
    assert!(
        notifications["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["kind"] == "quote_responded")
    );
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_quote_for_unknown_product_rejected() {
    let pool = pool().await;
    let customer = signup_and_login(&pool, "badquote").await;

    let resp = customer
        .client
        .post(format!("{}/api/quotes", base_url()))
        .json(&json!({ "items": [{ "product_id": i32::MAX, "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_lapsed_offer_expires_instead_of_accepting() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "lapsed").await;
    let battery = create_product(&admin.client, "42000.00", 10).await;

    let resp = customer
        .client
        .post(format!("{}/api/quotes", base_url()))
        .json(&json!({ "items": [{ "product_id": battery["id"], "quantity": 2 }] }))
        .send()
        .await
        .unwrap();
    let quote_id = expect_json(resp, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap();

    let resp = admin
        .client
        .put(format!("{}/api/admin/quotes/{quote_id}/respond", base_url()))
        .json(&json!({ "quoted_total": "80000.00", "valid_days": 7 }))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await;

    // The customer sat on it past the validity date.
    sqlx::query("UPDATE quotes SET valid_until = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(i32::try_from(quote_id).unwrap())
        .execute(&pool)
        .await
        .unwrap();

    let resp = customer
        .client
        .post(format!("{}/api/quotes/{quote_id}/accept", base_url()))
        .send()
        .await
        .unwrap();
    let body = expect_json(resp, StatusCode::CONFLICT).await;
    assert_eq!(body["error"], "This quote has expired");

    let resp = customer
        .client
        .get(format!("{}/api/quotes/{quote_id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(expect_json(resp, StatusCode::OK).await["status"], "expired");

    // Expired is final for both sides.
    let resp = customer
        .client
        .post(format!("{}/api/quotes/{quote_id}/reject", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = admin
        .client
        .put(format!("{}/api/admin/quotes/{quote_id}/respond", base_url()))
        .json(&json!({ "quoted_total": "79000.00", "valid_days": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_pricing_twice_notifies_once() {
    let pool = pool().await;
    let admin = admin_session(&pool).await;
    let customer = signup_and_login(&pool, "pricedonce").await;
    let panel = create_product(&admin.client, "18500.00", 10).await;

    let resp = customer
        .client
        .post(format!("{}/api/quotes", base_url()))
        .json(&json!({ "items": [{ "product_id": panel["id"], "quantity": 4 }] }))
        .send()
        .await
        .unwrap();
    let quote_id = expect_json(resp, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap();
    let respond_url = format!("{}/api/admin/quotes/{quote_id}/respond", base_url());

    let resp = admin
        .client
        .put(&respond_url)
        .json(&json!({ "quoted_total": "70000.00", "valid_days": 14 }))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::OK).await;
    let resp = admin
        .client
        .put(&respond_url)
        .json(&json!({ "quoted_total": "65000.00", "valid_days": 14 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let responded: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND kind = 'quote_responded'",
    )
    .bind(i32::try_from(customer.id).unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(responded, 1);
}
