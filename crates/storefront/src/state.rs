//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::analytics::AnalyticsRepository;
use crate::db::cart_items::CartItemRepository;
use crate::db::products::ProductRepository;
use crate::services::analytics::AnalyticsTracker;
use crate::services::cart::CartService;
use crate::services::client::ClientRegistry;
use crate::services::identity::{IdentityClient, IdentityError};

/// Cart service over the `PostgreSQL` repositories.
pub type StoreCartService = CartService<CartItemRepository, ProductRepository>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and client sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    products: Arc<ProductRepository>,
    carts: StoreCartService,
    clients: ClientRegistry,
    identity: IdentityClient,
    analytics: AnalyticsTracker,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the identity client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, IdentityError> {
        let analytics = AnalyticsTracker::new(AnalyticsRepository::new(pool.clone()));
        Self::with_analytics(config, pool, analytics)
    }

    /// Create application state that records events through `analytics`.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity client cannot be built.
    pub fn with_analytics(
        config: StorefrontConfig,
        pool: PgPool,
        analytics: AnalyticsTracker,
    ) -> Result<Self, IdentityError> {
        let identity = IdentityClient::new(&config.identity)?;
        let products = Arc::new(ProductRepository::new(pool.clone()));
        let carts = CartService::new(
            Arc::new(CartItemRepository::new(pool.clone())),
            Arc::clone(&products),
            analytics.clone(),
        );
        let clients = ClientRegistry::new(&config.clients);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                products,
                carts,
                clients,
                identity,
                analytics,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn products(&self) -> &ProductRepository {
        &self.inner.products
    }

    #[must_use]
    pub fn carts(&self) -> &StoreCartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn clients(&self) -> &ClientRegistry {
        &self.inner.clients
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    #[must_use]
    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.inner.analytics
    }
}
