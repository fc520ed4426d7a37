//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Database readiness
//!
//! # Cart
//! GET    /api/cart               - Cart view (items, count, subtotal, flags)
//! POST   /api/cart/load          - Re-hydrate from the store (auth)
//! POST   /api/cart/items         - Add or increment (auth)
//! PATCH  /api/cart/items/{id}    - Set quantity, <= 0 removes (auth)
//! DELETE /api/cart/items/{id}    - Remove (auth)
//! POST   /api/cart/toggle        - Toggle the cart panel
//!
//! # Client state
//! GET    /api/notices            - Drain pending notices
//! GET    /api/theme              - Theme state
//! PUT    /api/theme              - Set an explicit theme or `system`
//! PUT    /api/theme/system       - Report the OS preference
//!
//! # Catalog
//! GET    /api/products           - Listing: category, price range, tags, q, sort, limit
//! GET    /api/products/{id}      - Product lookup
//!
//! # Analytics
//! POST   /api/analytics/events   - Record a page view or search
//!
//! # Auth
//! POST   /auth/session           - Sign in with an identity-service access token
//! POST   /auth/logout            - Sign out
//!
//! # Admin
//! GET    /api/admin/dashboard    - Analytics summary and order stats
//! ```

pub mod analytics;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod health;
pub mod notices;
pub mod products;
pub mod theme;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/load", post(cart::load))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/toggle", post(cart::toggle))
}

/// Create the theme routes router.
pub fn theme_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(theme::show).put(theme::set))
        .route("/system", put(theme::report_system))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(auth::sign_in))
        .route("/logout", post(auth::sign_out))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/theme", theme_routes())
        .route("/notices", get(notices::drain))
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::show))
        .route("/analytics/events", post(analytics::record))
        .route("/admin/dashboard", get(dashboard::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
        .nest("/auth", auth_routes())
}
