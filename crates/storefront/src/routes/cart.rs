//! Cart route handlers.
//!
//! Every handler answers with the full [`CartView`] so the client can render
//! from a single response. Store writes happen in the background; failures
//! show up later on `/api/notices`.

use std::num::NonZeroU32;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use neonmart_core::{CartItemId, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{Client, RequireAuth};
use crate::services::cart::CartView;
use crate::state::AppState;

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    /// Defaults to one.
    pub quantity: Option<u32>,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// Zero or less removes the line.
    pub quantity: i64,
}

/// Current cart.
#[instrument(skip(state, client))]
pub async fn show(State(state): State<AppState>, Client(client): Client) -> Json<CartView> {
    Json(state.carts().view(&client).await)
}

/// Re-hydrate the cart from the store.
#[instrument(skip(state, user, client), fields(user_id = %user.id))]
pub async fn load(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Client(client): Client,
) -> Json<CartView> {
    state.carts().load(&client, user.id).await;
    Json(state.carts().view(&client).await)
}

/// Add a product, or increment its existing line.
#[instrument(skip(state, user, client), fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Client(client): Client,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let quantity = NonZeroU32::new(request.quantity.unwrap_or(1))
        .ok_or_else(|| AppError::BadRequest("quantity must be at least 1".to_string()))?;

    state
        .carts()
        .add(&client, user.id, request.product_id, quantity)
        .await?;

    let product_id = request.product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", &product_id)]));

    Ok(Json(state.carts().view(&client).await))
}

/// Set a line's quantity.
#[instrument(skip(state, _user, client))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Client(client): Client,
    Path(item_id): Path<CartItemId>,
    Json(request): Json<UpdateItemRequest>,
) -> Json<CartView> {
    state
        .carts()
        .change_quantity(&client, item_id, request.quantity)
        .await;
    Json(state.carts().view(&client).await)
}

/// Remove a line.
#[instrument(skip(state, _user, client))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Client(client): Client,
    Path(item_id): Path<CartItemId>,
) -> Json<CartView> {
    if state.carts().remove(&client, item_id).await.is_some() {
        let item_id = item_id.to_string();
        add_breadcrumb("cart", "Removed item", Some(&[("item_id", &item_id)]));
    }
    Json(state.carts().view(&client).await)
}

/// Open or close the cart panel.
#[instrument(skip(state, client))]
pub async fn toggle(State(state): State<AppState>, Client(client): Client) -> Json<CartView> {
    Json(state.carts().toggle_visible(&client).await)
}
