//! Signup, verification gate, login, logout and password changes.
//!
//! Requires a running server and its database; see the crate docs.

use reqwest::StatusCode;
use serde_json::json;
use solarshop_integration_tests::{
    TEST_PASSWORD, base_url, client, expect_json, pool, signup_and_login, unique_email,
};

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_unverified_login_is_forbidden() {
    let c = client();
    let email = unique_email("unverified");

    let resp = c
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "first_name": "New",
            "last_name": "Customer",
        }))
        .send()
        .await
        .unwrap();
    let user = expect_json(resp, StatusCode::CREATED).await;
    assert_eq!(user["email_verified"], false);
    assert_eq!(user["role"], "customer");
    assert!(user.get("password_hash").is_none());

    let resp = c
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_duplicate_signup_conflicts() {
    let pool = pool().await;
    let user = signup_and_login(&pool, "dup").await;

    let resp = client()
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "email": user.email.to_uppercase(),
            "password": TEST_PASSWORD,
            "first_name": "Again",
            "last_name": "Customer",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_weak_password_rejected() {
    let resp = client()
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "email": unique_email("weak"),
            "password": "short",
            "first_name": "Weak",
            "last_name": "Password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_session_lifecycle() {
    let pool = pool().await;
    let user = signup_and_login(&pool, "session").await;

    let resp = user
        .client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .unwrap();
    let me = expect_json(resp, StatusCode::OK).await;
    assert_eq!(me["email"], user.email.as_str());

    let resp = user
        .client
        .post(format!("{}/api/auth/logout", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = user
        .client
        .get(format!("{}/api/auth/me", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_wrong_password_is_unauthorized() {
    let pool = pool().await;
    let user = signup_and_login(&pool, "wrongpw").await;

    let resp = client()
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({ "email": user.email, "password": "Not-the-password-1" }))
        .send()
        .await
        .unwrap();
    let body = expect_json(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_change_password_requires_current() {
    let pool = pool().await;
    let user = signup_and_login(&pool, "chpw").await;

    let resp = user
        .client
        .put(format!("{}/api/account/password", base_url()))
        .json(&json!({
            "current_password": "Wrong-password-9",
            "new_password": "Brand-new-pass-7",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = user
        .client
        .put(format!("{}/api/account/password", base_url()))
        .json(&json!({
            "current_password": TEST_PASSWORD,
            "new_password": "Brand-new-pass-7",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_forgot_password_does_not_reveal_accounts() {
    let resp = client()
        .post(format!("{}/api/auth/password/forgot", base_url()))
        .json(&json!({ "email": unique_email("nobody") }))
        .send()
        .await
        .unwrap();
    let body = expect_json(resp, StatusCode::OK).await;
    assert!(body["message"].is_string());
}

#[tokio::test]
#[ignore = "Requires a running server and database"]
async fn test_concurrent_wrong_codes_share_one_attempt_budget() {
    const GUESSES: usize = 40;

    let pool = pool().await;
    let email = unique_email("guesser");
    let resp = client()
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "first_name": "Many",
            "last_name": "Guesses",
        }))
        .send()
        .await
        .unwrap();
    expect_json(resp, StatusCode::CREATED).await;

    let mut guesses = tokio::task::JoinSet::new();
    for _ in 0..GUESSES {
        let email = email.clone();
        guesses.spawn(async move {
            let resp = client()
                .post(format!("{}/api/auth/verify-email", base_url()))
                .json(&json!({ "email": email, "code": "wrong!" }))
                .send()
                .await
                .unwrap();
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap();
            (status, body["error"].as_str().unwrap_or_default().to_string())
        });
    }
    let results = guesses.join_all().await;

    assert!(results.iter().all(|(status, _)| *status == StatusCode::BAD_REQUEST));
    let compared = results
        .iter()
        .filter(|(_, error)| error == "Invalid verification code")
        .count();
    assert!(compared <= 4, "{compared} guesses were compared as still valid");

    let attempts: i32 = sqlx::query_scalar(
        r"
        SELECT c.attempts FROM email_verification_codes c
        JOIN users u ON u.id = c.user_id
        WHERE u.email = $1
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT 1
        ",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(attempts, 5);
}
