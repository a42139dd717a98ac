//! Admin back-office API.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads the user's role from the database on each request.
//!
//! # Route Structure
//!
//! ```text
//! GET    /api/admin/dashboard                         - Store overview
//!
//! # Catalog
//! POST   /api/admin/categories                        - Create category
//! PUT    /api/admin/categories/{id}                   - Update category
//! DELETE /api/admin/categories/{id}                   - Delete category
//! GET    /api/admin/products                          - All products, any status
//! POST   /api/admin/products                          - Create (initial stock via ledger)
//! GET    /api/admin/products/{id}                     - Product detail
//! PUT    /api/admin/products/{id}                     - Update (stock untouched)
//! DELETE /api/admin/products/{id}                     - Archive
//! POST   /api/admin/products/{id}/images              - Upload image (multipart `image`)
//! DELETE /api/admin/products/{id}/images/{image_id}   - Delete image
//! PUT    /api/admin/products/{id}/images/{image_id}/primary - Make primary
//!
//! # Inventory
//! GET    /api/admin/inventory/movements               - Ledger (filtered, paged)
//! POST   /api/admin/inventory/movements               - Record a movement
//! POST   /api/admin/inventory/stock-take              - Adjust to a physical count
//! GET    /api/admin/inventory/products/{id}/movements - One product's ledger
//! GET    /api/admin/inventory/low-stock               - Below threshold
//! GET    /api/admin/inventory/audit                   - Balance vs ledger check
//!
//! # Orders, quotes, reviews
//! GET    /api/admin/orders                            - Orders (filtered, paged)
//! GET    /api/admin/orders/{id}                       - Order detail
//! PUT    /api/admin/orders/{id}/status                - Move through lifecycle
//! GET    /api/admin/quotes                            - Quote requests
//! GET    /api/admin/quotes/{id}                       - Quote detail
//! PUT    /api/admin/quotes/{id}/respond               - Price a pending quote
//! PUT    /api/admin/quotes/{id}/reject                - Decline a pending quote
//! GET    /api/admin/reviews                           - Moderation queue
//! PUT    /api/admin/reviews/{id}/approve              - Publish
//! PUT    /api/admin/reviews/{id}/reject               - Hide
//! DELETE /api/admin/reviews/{id}                      - Delete
//!
//! # Store
//! POST   /api/admin/notifications/broadcast           - Notify many users
//! GET    /api/admin/settings                          - Store settings
//! PUT    /api/admin/settings                          - Replace settings
//! GET    /api/admin/users                             - Users (search, role)
//! PUT    /api/admin/users/{id}/role                   - Change role
//! ```

pub mod dashboard;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod quotes;
pub mod reviews;
pub mod settings;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Room for multipart boundaries and the `alt_text` field.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the catalog routes router.
pub fn product_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::archive),
        )
        .route(
            "/{id}/images",
            post(products::upload_image).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route(
            "/{id}/images/{image_id}",
            delete(products::delete_image),
        )
        .route(
            "/{id}/images/{image_id}/primary",
            put(products::set_primary_image),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::create_category))
        .route(
            "/{id}",
            put(products::update_category).delete(products::delete_category),
        )
}

/// Create the inventory routes router.
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/movements",
            get(inventory::list_movements).post(inventory::record),
        )
        .route("/stock-take", post(inventory::stock_take))
        .route("/products/{id}/movements", get(inventory::product_history))
        .route("/low-stock", get(inventory::low_stock))
        .route("/audit", get(inventory::audit))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the quote routes router.
pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(quotes::list))
        .route("/{id}", get(quotes::show))
        .route("/{id}/respond", put(quotes::respond))
        .route("/{id}/reject", put(quotes::reject))
}

/// Create the review moderation routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::list))
        .route("/{id}", delete(reviews::delete))
        .route("/{id}/approve", put(reviews::approve))
        .route("/{id}/reject", put(reviews::reject))
}

/// Create all admin routes.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::show))
        .nest("/categories", category_routes())
        .nest("/products", product_routes(max_upload_bytes))
        .nest("/inventory", inventory_routes())
        .nest("/orders", order_routes())
        .nest("/quotes", quote_routes())
        .nest("/reviews", review_routes())
        .route("/notifications/broadcast", post(notifications::broadcast))
        .route("/settings", get(settings::show).put(settings::update))
        .route("/users", get(users::list))
        .route("/users/{id}/role", put(users::set_role))
}
