//! Integration tests for NeonMart.
//!
//! Tests drive the storefront in-process: the router is called through
//! `tower::ServiceExt::oneshot` with an in-memory session store, and the cart
//! controller runs against [`InMemoryStore`]. No database or identity service
//! needs to be running.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p neonmart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `analytics_api` - Client-reported events and catalog query validation
//! - `cart_flow` - Cart controller scenarios across sign-in and sign-out
//! - `client_api` - Theme, cart and notice endpoints over HTTP
//! - `dashboard` - Analytics aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use neonmart_core::{Price, ProductId, ProductStatus};
use neonmart_storefront::config::{ClientStateConfig, IdentityConfig, StorefrontConfig};
use neonmart_storefront::db::memory::InMemoryStore;
use neonmart_storefront::middleware::session_layer;
use neonmart_storefront::models::Product;
use neonmart_storefront::services::analytics::AnalyticsTracker;
use neonmart_storefront::services::cart::CartService;
use neonmart_storefront::services::identity::IdentityError;
use neonmart_storefront::state::AppState;

/// Cart service wired to a single in-memory store for both lines and catalog.
pub type MemoryCartService = CartService<InMemoryStore, InMemoryStore>;

/// Build a cart service over `store` with analytics turned off.
#[must_use]
pub fn memory_cart_service(store: &Arc<InMemoryStore>) -> MemoryCartService {
    CartService::new(
        Arc::clone(store),
        Arc::clone(store),
        AnalyticsTracker::disabled(),
    )
}

/// An active catalog product.
#[must_use]
pub fn product(name: &str, cents: i64, stock: i32) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::generate(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: Some(format!("{name} for your desk")),
        price: Price::from_cents(cents),
        compare_at_price: None,
        sku: None,
        stock_quantity: stock,
        category_id: None,
        category_name: Some("Lighting".to_string()),
        status: ProductStatus::Active,
        featured: false,
        tags: vec!["neon".to_string()],
        images: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Configuration pointing at services that are never contacted.
///
/// # Panics
///
/// Panics if the hard-coded URLs fail to parse.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://neonmart@127.0.0.1:5432/neonmart_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("kT9#vQ2!mZ7@pL4$wX8^nB3&hR6*jF1%"),
        identity: IdentityConfig {
            url: Url::parse("http://127.0.0.1:9").unwrap(),
            anon_key: SecretString::from("anon-test-key"),
        },
        clients: ClientStateConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// In-process storefront with cookie carry-over between requests.
///
/// The `PostgreSQL` pool connects lazily, so routes that never touch the
/// database work without one.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    /// Build the storefront router with an in-memory session store.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built.
    #[must_use]
    pub fn new() -> Self {
        Self::build(AppState::new)
    }

    /// Like [`new`](Self::new), but analytics events land in `store`.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built.
    #[must_use]
    pub fn with_analytics(store: &Arc<InMemoryStore>) -> Self {
        let analytics = AnalyticsTracker::in_memory(Arc::clone(store));
        Self::build(move |config, pool| AppState::with_analytics(config, pool, analytics))
    }

    #[allow(clippy::unwrap_used)]
    fn build(
        state: impl FnOnce(StorefrontConfig, PgPool) -> Result<AppState, IdentityError>,
    ) -> Self {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://neonmart@127.0.0.1:5432/neonmart_test")
            .unwrap();
        let state = state(test_config(), pool).unwrap();
        let router = neonmart_storefront::app(state, session_layer(MemoryStore::default(), false));
        Self {
            router,
            cookie: None,
        }
    }

    /// Send a request, attaching and then updating the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    #[allow(clippy::unwrap_used)]
    pub async fn send(
        &mut self,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        self.remember_cookie(&response);

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send("GET", uri, &[], None).await
    }

    fn remember_cookie(&mut self, response: &Response<Body>) {
        if let Some(pair) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(pair.to_string());
        }
    }

    /// Another browser talking to the same server, with no cookie yet.
    #[must_use]
    pub fn new_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Whether the server has issued a session cookie yet.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
