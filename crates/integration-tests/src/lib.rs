//! Shared helpers for the SolarShop end-to-end tests.
//!
//! The tests talk to a running server over HTTP and use the database only
//! for the steps a human would do out of band: confirming an emailed code
//! and granting the admin role.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate, then start the server with rate limiting off
//! cargo run -p solarshop-cli -- migrate
//! SOLARSHOP_RATE_LIMIT=false cargo run -p solarshop-server
//!
//! # Run the ignored tests against it
//! cargo test -p solarshop-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SOLARSHOP_TEST_URL` - server base URL (default `http://localhost:8080`)
//! - `SOLARSHOP_DATABASE_URL` (or `DATABASE_URL`) - same database the server uses

#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Password used for every account the tests create.
pub const TEST_PASSWORD: &str = "Solar-panel-42";

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SOLARSHOP_TEST_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// A client with its own cookie jar, so each one is a separate session.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Connect to the server's database.
pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("SOLARSHOP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("SOLARSHOP_DATABASE_URL or DATABASE_URL must be set");
    PgPool::connect(url.expose_secret())
        .await
        .expect("Failed to connect to database")
}

/// A throwaway address that will never collide with another run.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@test.solarshop.local", Uuid::new_v4().simple())
}

/// A unique SKU for products created by a test.
#[must_use]
pub fn unique_sku(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body = response.text().await.unwrap();
    assert_eq!(actual, status, "unexpected status, body: {body}");
    serde_json::from_str(&body).unwrap_or(Value::Null)
}

/// A logged-in session for one account.
pub struct TestUser {
    pub client: Client,
    pub email: String,
    pub id: i64,
}

/// Sign up through the API, confirm the email in the database, log in.
pub async fn signup_and_login(pool: &PgPool, prefix: &str) -> TestUser {
    let client = client();
    let email = unique_email(prefix);

    let response = client
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "first_name": "Test",
            "last_name": prefix,
        }))
        .send()
        .await
        .unwrap();
    let user = expect_json(response, StatusCode::CREATED).await;

    sqlx::query("UPDATE users SET email_verified = TRUE WHERE email = $1")
        .bind(&email)
        .execute(pool)
        .await
        .unwrap();

    login(&client, &email).await;

    TestUser {
        client,
        email,
        id: user["id"].as_i64().unwrap(),
    }
}

/// Same as [`signup_and_login`], with the admin role granted before login.
pub async fn admin_session(pool: &PgPool) -> TestUser {
    let user = signup_and_login(pool, "admin").await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = $1")
        .bind(&user.email)
        .execute(pool)
        .await
        .unwrap();
    user
}

/// Log in with [`TEST_PASSWORD`].
pub async fn login(client: &Client, email: &str) {
    let response = client
        .post(format!("{}/api/auth/login", base_url()))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::OK).await;
}

/// Create an active product with the given stock, returning its JSON.
pub async fn create_product(admin: &Client, price: &str, stock: i32) -> Value {
    let sku = unique_sku("IT");
    let response = admin
        .post(format!("{}/api/admin/products", base_url()))
        .json(&json!({
            "name": format!("Test Panel {sku}"),
            "sku": sku,
            "price": price,
            "initial_stock": stock,
            "status": "active",
        }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::CREATED).await
}

/// Add a Nairobi delivery address for the session's user.
pub async fn create_address(client: &Client) -> Value {
    let response = client
        .post(format!("{}/api/addresses", base_url()))
        .json(&json!({
            "recipient_name": "Test Customer",
            "phone": "0712345678",
            "line1": "Moi Avenue 12",
            "city": "Nairobi",
            "county": "Nairobi",
        }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::CREATED).await
}
