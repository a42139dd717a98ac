//! HTTP route handlers.
//!
//! Every endpoint speaks JSON. Errors are `{"error": "..."}` with a
//! matching status code.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//! GET  /uploads/*                       - Product images (static)
//!
//! # Auth (strict rate limit)
//! POST /api/auth/signup                 - Create account, email a code
//! POST /api/auth/verify-email           - Confirm the emailed code
//! POST /api/auth/verify-email/resend    - Send a fresh code
//! POST /api/auth/login                  - Start a session
//! POST /api/auth/logout                 - End the session
//! GET  /api/auth/me                     - Current user
//! POST /api/auth/password/forgot        - Email a reset link
//! POST /api/auth/password/reset         - Set a new password from a link
//!
//! # Account
//! PUT  /api/account/profile             - Update name and phone
//! PUT  /api/account/password            - Change password
//!
//! # Catalog
//! GET  /api/categories                  - All categories
//! GET  /api/products                    - Active products (filter, sort, page)
//! GET  /api/products/{slug}             - Product detail
//! GET  /api/products/{id}/reviews       - Approved reviews with summary
//! POST /api/products/{id}/reviews       - Submit a review
//!
//! # Cart
//! GET    /api/cart                      - Cart with totals
//! DELETE /api/cart                      - Empty the cart
//! POST   /api/cart/items                - Add (merges quantities)
//! PUT    /api/cart/items/{product_id}   - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}   - Remove a line
//!
//! # Orders
//! POST /api/checkout                    - Place an order from the cart
//! GET  /api/orders                      - Order history
//! GET  /api/orders/{id}                 - Order detail
//! POST /api/orders/{id}/cancel          - Cancel a pending order
//! GET  /api/orders/{id}/payments        - Payment attempts
//!
//! # Payments
//! POST /api/payments/mpesa/stk-push     - Prompt the customer's phone
//! POST /api/payments/mpesa/callback     - Safaricom result callback (public)
//! GET  /api/payments/mpesa/status/{id}  - Poll an attempt
//!
//! # Addresses, quotes, notifications
//! GET|POST   /api/addresses
//! PUT|DELETE /api/addresses/{id}
//! POST       /api/addresses/{id}/default
//! GET|POST   /api/quotes
//! GET        /api/quotes/{id}
//! POST       /api/quotes/{id}/accept|reject
//! GET        /api/notifications
//! GET        /api/notifications/unread-count
//! POST       /api/notifications/read-all
//! POST       /api/notifications/{id}/read
//! DELETE     /api/notifications/{id}
//!
//! # Admin (see `admin` module)
//! /api/admin/...
//! ```

pub mod account;
pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod quotes;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Map a session store failure to a 500.
pub(crate) fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-email", post(auth::verify_email))
        .route("/verify-email/resend", post(auth::resend_verification))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/password/forgot", post(auth::forgot_password))
        .route("/password/reset", post(auth::reset_password))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(account::update_profile))
        .route("/password", put(account::change_password))
}

/// Create the product routes router.
///
/// Both routes share the `{slug}` segment; the reviews routes read it as a
/// numeric product id.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_products))
        .route("/{slug}", get(catalog::product_detail))
        .route(
            "/{slug}/reviews",
            get(catalog::list_reviews).post(catalog::create_review),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::set_item).delete(cart::remove_item),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/payments", get(orders::payments))
}

/// Create the customer payment routes router. The callback is mounted
/// separately so it is never rate limited.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/stk-push", post(payments::stk_push))
        .route("/status/{checkout_request_id}", get(payments::status))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::list).post(addresses::create))
        .route(
            "/{id}",
            put(addresses::update).delete(addresses::delete),
        )
        .route("/{id}/default", post(addresses::set_default))
}

/// Create the quote routes router.
pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(quotes::list).post(quotes::create))
        .route("/{id}", get(quotes::show))
        .route("/{id}/accept", post(quotes::accept))
        .route("/{id}/reject", post(quotes::reject))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}", delete(notifications::delete))
        .route("/{id}/read", post(notifications::mark_read))
}

/// Create all routes for the server.
pub fn routes(config: &ServerConfig) -> Router<AppState> {
    let mut auth = auth_routes();
    let mut api = Router::new()
        .route("/categories", get(catalog::list_categories))
        .nest("/products", product_routes())
        .nest("/account", account_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(orders::checkout))
        .nest("/orders", order_routes())
        .nest("/payments/mpesa", payment_routes())
        .nest("/addresses", address_routes())
        .nest("/quotes", quote_routes())
        .nest("/notifications", notification_routes())
        .nest("/admin", admin::routes(config.max_upload_bytes));

    if config.rate_limit {
        auth = auth.layer(auth_rate_limiter());
        api = api.layer(api_rate_limiter());
    }

    Router::new()
        // Health checks
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Safaricom callback (public, unthrottled)
        .route("/api/payments/mpesa/callback", post(payments::callback))
        // Auth routes
        .nest("/api/auth", auth)
        // Everything else under /api
        .nest("/api", api)
}
