//! Cart controller.
//!
//! Binds a [`ClientSession`]'s cart to the store. Each operation reduces the
//! in-memory cart under the session lock, releases the lock, and hands the
//! resulting write to [`CartSync`]. Hydration is the only read path.

use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use neonmart_core::analytics::NewAnalyticsEvent;
use neonmart_core::cart::{CartAction, CartEffect, CartLineItem, CartState};
use neonmart_core::{CartItemId, Price, ProductId, ProductStatus, UserId};

use super::analytics::AnalyticsTracker;
use super::cart_sync::CartSync;
use super::client::ClientSession;
use crate::db::{CartStore, ProductCatalog, RepositoryError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist or is not for sale.
    #[error("product not found")]
    ProductNotFound,

    /// The product has no stock left.
    #[error("product is out of stock")]
    OutOfStock,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineItem>,
    pub item_count: u64,
    pub subtotal: Price,
    pub subtotal_display: String,
    pub is_open: bool,
    pub is_loading: bool,
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        let subtotal = cart.subtotal();
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            subtotal,
            subtotal_display: subtotal.display(),
            is_open: cart.is_open(),
            is_loading: cart.is_loading(),
        }
    }
}

/// Cart operations over a store and catalog.
pub struct CartService<S, C> {
    sync: CartSync<S>,
    catalog: Arc<C>,
    analytics: AnalyticsTracker,
}

impl<S, C> Clone for CartService<S, C> {
    fn clone(&self) -> Self {
        Self {
            sync: self.sync.clone(),
            catalog: Arc::clone(&self.catalog),
            analytics: self.analytics.clone(),
        }
    }
}

impl<S: CartStore, C: ProductCatalog> CartService<S, C> {
    #[must_use]
    pub fn new(store: Arc<S>, catalog: Arc<C>, analytics: AnalyticsTracker) -> Self {
        Self {
            sync: CartSync::new(store),
            catalog,
            analytics,
        }
    }

    /// The background writer, for waiting on pending writes.
    #[must_use]
    pub const fn sync(&self) -> &CartSync<S> {
        &self.sync
    }

    /// Hydrate the session's cart from the store.
    ///
    /// On failure the cart is left as it was and a notice is posted.
    #[instrument(skip(self, client), fields(client_id = %client.id()))]
    pub async fn load(&self, client: &ClientSession, user_id: UserId) {
        let _hydrating = client.hydration().await;
        self.load_locked(client, user_id).await;
    }

    /// Hydrate unless the cart already belongs to `user_id`.
    ///
    /// Concurrent first requests for a session read the store once: later
    /// callers wait for the running hydration and then find it done.
    pub async fn ensure_loaded(&self, client: &ClientSession, user_id: UserId) {
        let _hydrating = client.hydration().await;
        let current = client.lock().await.hydrated_for;
        if current != Some(user_id) {
            self.load_locked(client, user_id).await;
        }
    }

    async fn load_locked(&self, client: &ClientSession, user_id: UserId) {
        client.lock().await.cart.reduce(CartAction::SetLoading(true));

        let fetched = self.sync.store().list_for_user(user_id).await;

        let mut state = client.lock().await;
        match fetched {
            Ok(items) => {
                tracing::debug!(count = items.len(), "Hydrated cart");
                state.cart.reduce(CartAction::Hydrate(items));
                state.hydrated_for = Some(user_id);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load cart");
                client.notices().error("We couldn't load your cart. Please try again.");
            }
        }
        state.cart.reduce(CartAction::SetLoading(false));
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product is missing or not active.
    /// Returns `CartError::OutOfStock` if the product has no stock.
    /// Returns `CartError::Repository` if the catalog lookup fails.
    #[instrument(skip(self, client), fields(client_id = %client.id()))]
    pub async fn add(
        &self,
        client: &ClientSession,
        user_id: UserId,
        product_id: ProductId,
        quantity: NonZeroU32,
    ) -> Result<CartLineItem, CartError> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .filter(|p| p.status == ProductStatus::Active)
            .ok_or(CartError::ProductNotFound)?;
        if !product.in_stock() {
            return Err(CartError::OutOfStock);
        }

        let incoming = CartLineItem::new(
            user_id,
            product_id,
            Some(product.snapshot()),
            quantity,
            Utc::now(),
        );
        let line = client.lock().await.cart.add_or_increment(incoming);

        self.sync
            .dispatch(CartEffect::Persist(line.clone()), client.notices());
        self.analytics.track(
            NewAnalyticsEvent::add_to_cart(product_id, quantity.get())
                .with_user(Some(user_id))
                .with_session(client.id().to_string()),
        );

        Ok(line)
    }

    /// Set a line's quantity. `quantity <= 0` removes the line.
    ///
    /// Unknown item IDs are ignored and yield `CartEffect::None`.
    #[instrument(skip(self, client), fields(client_id = %client.id()))]
    pub async fn change_quantity(
        &self,
        client: &ClientSession,
        item_id: CartItemId,
        quantity: i64,
    ) -> CartEffect {
        let effect = client.lock().await.cart.set_quantity(item_id, quantity);

        self.sync.dispatch(effect.clone(), client.notices());
        if let CartEffect::Delete(line) = &effect {
            self.track_removal(client, line);
        }

        effect
    }

    /// Remove a line. Returns the removed line, or `None` if it was not in the cart.
    #[instrument(skip(self, client), fields(client_id = %client.id()))]
    pub async fn remove(&self, client: &ClientSession, item_id: CartItemId) -> Option<CartLineItem> {
        let removed = client.lock().await.cart.take(item_id)?;

        self.sync
            .dispatch(CartEffect::Delete(removed.clone()), client.notices());
        self.track_removal(client, &removed);

        Some(removed)
    }

    /// Flip the overlay flag.
    pub async fn toggle_visible(&self, client: &ClientSession) -> CartView {
        let mut state = client.lock().await;
        state.cart.reduce(CartAction::ToggleVisible);
        CartView::from(&state.cart)
    }

    /// Forget the cart locally. Stored lines are kept for the next sign-in.
    pub async fn sign_out(&self, client: &ClientSession) {
        let mut state = client.lock().await;
        state.cart.reduce(CartAction::Clear);
        state.hydrated_for = None;
    }

    pub async fn view(&self, client: &ClientSession) -> CartView {
        CartView::from(&client.lock().await.cart)
    }

    fn track_removal(&self, client: &ClientSession, line: &CartLineItem) {
        self.analytics.track(
            NewAnalyticsEvent::remove_from_cart(line.product_id)
                .with_user(Some(line.user_id))
                .with_session(client.id().to_string()),
        );
    }
}
