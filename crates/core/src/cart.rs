//! Cart state container.
//!
//! `CartState` is the in-memory source of truth for one shopper's cart once it
//! has been hydrated from the store. Every mutation is a synchronous reduction
//! with no I/O. Mutations that must reach the store report a [`CartEffect`]
//! describing the write; issuing that write is the caller's job.
//!
//! # Invariants
//!
//! - At most one line per product.
//! - A stored line always has a quantity of at least one. Requests for a
//!   quantity of zero or less are an explicit removal ([`QuantityUpdate::Remove`]).

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, Price, ProductId, UserId};

/// Product fields copied onto a cart line for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// One product and quantity within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Absent when the referenced product has been deleted.
    pub product: Option<ProductSnapshot>,
    pub quantity: NonZeroU32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Create a brand-new line with a fresh ID, stamped at `now`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        product: Option<ProductSnapshot>,
        quantity: NonZeroU32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CartItemId::generate(),
            user_id,
            product_id,
            product,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unit price, treating a missing product as free.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        self.product.as_ref().map_or(Price::ZERO, |p| p.price)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price().times(self.quantity.get())
    }
}

/// What a requested quantity means for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Store this quantity.
    Set(NonZeroU32),
    /// Drop the line entirely.
    Remove,
}

impl QuantityUpdate {
    /// Classify a raw requested quantity.
    ///
    /// Anything `<= 0` is a removal. Values above `u32::MAX` clamp.
    #[must_use]
    pub fn from_requested(quantity: i64) -> Self {
        if quantity <= 0 {
            return Self::Remove;
        }
        let clamped = u32::try_from(quantity).unwrap_or(u32::MAX);
        NonZeroU32::new(clamped).map_or(Self::Remove, Self::Set)
    }
}

/// A change to the cart, as dispatched by user interaction or hydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Hydrate(Vec<CartLineItem>),
    AddOrIncrement(CartLineItem),
    SetQuantity { item_id: CartItemId, quantity: i64 },
    Remove(CartItemId),
    Clear,
    ToggleVisible,
    SetLoading(bool),
}

/// The store write a reduction requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEffect {
    /// Nothing to persist.
    None,
    /// Insert or update this line (absolute quantity).
    Persist(CartLineItem),
    /// Delete this line. Carries the removed line so the write can be
    /// ordered with other writes for the same product.
    Delete(CartLineItem),
}

/// In-memory cart for one client session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    items: Vec<CartLineItem>,
    is_open: bool,
    is_loading: bool,
}

impl CartState {
    /// An empty, closed, idle cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action and report the store write it implies.
    pub fn reduce(&mut self, action: CartAction) -> CartEffect {
        match action {
            CartAction::Hydrate(items) => {
                self.hydrate(items);
                CartEffect::None
            }
            CartAction::AddOrIncrement(item) => CartEffect::Persist(self.add_or_increment(item)),
            CartAction::SetQuantity { item_id, quantity } => self.set_quantity(item_id, quantity),
            CartAction::Remove(item_id) => {
                self.take(item_id).map_or(CartEffect::None, CartEffect::Delete)
            }
            CartAction::Clear => {
                self.clear();
                CartEffect::None
            }
            CartAction::ToggleVisible => {
                self.toggle_visible();
                CartEffect::None
            }
            CartAction::SetLoading(flag) => {
                self.set_loading(flag);
                CartEffect::None
            }
        }
    }

    /// Replace every line with `items`.
    ///
    /// Input is trusted to be deduplicated by product already.
    pub fn hydrate(&mut self, items: Vec<CartLineItem>) {
        self.items = items;
    }

    /// Merge `item` into the cart and return the resulting line.
    ///
    /// An existing line for the same product keeps its ID and creation time;
    /// its quantity grows by `item.quantity` and its update time (and product
    /// snapshot, when the incoming one is present) is refreshed.
    pub fn add_or_increment(&mut self, item: CartLineItem) -> CartLineItem {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            line.quantity = line.quantity.saturating_add(item.quantity.get());
            line.updated_at = item.updated_at;
            if item.product.is_some() {
                line.product = item.product;
            }
            return line.clone();
        }

        self.items.push(item.clone());
        item
    }

    /// Set a line's quantity from a raw requested value.
    ///
    /// `quantity <= 0` removes the line. Unknown IDs are ignored.
    pub fn set_quantity(&mut self, item_id: CartItemId, quantity: i64) -> CartEffect {
        self.apply_quantity(item_id, QuantityUpdate::from_requested(quantity))
    }

    /// Apply an already-classified quantity update.
    pub fn apply_quantity(&mut self, item_id: CartItemId, update: QuantityUpdate) -> CartEffect {
        match update {
            QuantityUpdate::Remove => {
                self.take(item_id).map_or(CartEffect::None, CartEffect::Delete)
            }
            QuantityUpdate::Set(quantity) => match self.items.iter_mut().find(|l| l.id == item_id) {
                Some(line) => {
                    line.quantity = quantity;
                    CartEffect::Persist(line.clone())
                }
                None => CartEffect::None,
            },
        }
    }

    /// Remove a line and hand it back.
    pub fn take(&mut self, item_id: CartItemId) -> Option<CartLineItem> {
        let index = self.items.iter().position(|line| line.id == item_id)?;
        Some(self.items.remove(index))
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Flip the overlay panel flag.
    pub fn toggle_visible(&mut self) {
        self.is_open = !self.is_open;
    }

    /// Set the in-flight hydration flag.
    pub fn set_loading(&mut self, flag: bool) {
        self.is_loading = flag;
    }

    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, item_id: CartItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.id == item_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of line totals. Lines without a product snapshot count as zero.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn snapshot(cents: i64) -> ProductSnapshot {
        ProductSnapshot {
            name: "Glow Stick".to_string(),
            price: Price::from_cents(cents),
            images: vec!["/img/glow.png".to_string()],
            category: None,
        }
    }

    fn line(user: UserId, product: ProductId, n: u32, cents: Option<i64>) -> CartLineItem {
        CartLineItem::new(user, product, cents.map(snapshot), qty(n), Utc::now())
    }

    #[test]
    fn test_repeated_adds_keep_one_line_per_product() {
        let user = UserId::generate();
        let product = ProductId::generate();
        let mut cart = CartState::new();

        for n in [1, 4, 2] {
            cart.add_or_increment(line(user, product, n, Some(100)));
        }

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 7);
    }

    #[test]
    fn test_increment_keeps_original_id_and_refreshes_timestamp() {
        let user = UserId::generate();
        let product = ProductId::generate();
        let mut cart = CartState::new();
        let first = line(user, product, 1, Some(100));
        let first_id = first.id;
        cart.add_or_increment(first);

        let mut second = line(user, product, 1, Some(100));
        second.updated_at += chrono::Duration::seconds(30);
        let refreshed = second.updated_at;
        let merged = cart.add_or_increment(second);

        assert_eq!(merged.id, first_id);
        assert_eq!(merged.updated_at, refreshed);
    }

    #[test]
    fn test_add_then_increment_scenario() {
        let user = UserId::generate();
        let product = ProductId::generate();
        let mut cart = CartState::new();

        cart.add_or_increment(line(user, product, 1, Some(999)));
        cart.add_or_increment(line(user, product, 2, Some(999)));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Price::from_cents(2997));
    }

    #[test]
    fn test_zero_and_negative_quantities_remove() {
        let user = UserId::generate();
        for requested in [0, -5] {
            let mut cart = CartState::new();
            let item = line(user, ProductId::generate(), 3, Some(100));
            let id = item.id;
            cart.add_or_increment(item.clone());

            let effect = cart.set_quantity(id, requested);

            assert_eq!(effect, CartEffect::Delete(item));
            assert!(cart.get(id).is_none());
        }
    }

    #[test]
    fn test_positive_quantity_sets_and_persists() {
        let mut cart = CartState::new();
        let item = line(UserId::generate(), ProductId::generate(), 3, Some(100));
        let id = item.id;
        cart.add_or_increment(item);

        let effect = cart.set_quantity(id, 8);

        assert_eq!(cart.get(id).unwrap().quantity.get(), 8);
        assert!(matches!(effect, CartEffect::Persist(l) if l.quantity.get() == 8));
    }

    #[test]
    fn test_set_quantity_on_unknown_id_is_ignored() {
        let mut cart = CartState::new();
        cart.add_or_increment(line(UserId::generate(), ProductId::generate(), 1, None));
        let before = cart.clone();

        assert_eq!(cart.set_quantity(CartItemId::generate(), 4), CartEffect::None);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut cart = CartState::new();
        cart.add_or_increment(line(UserId::generate(), ProductId::generate(), 2, Some(100)));
        let before = cart.clone();

        let effect = cart.reduce(CartAction::Remove(CartItemId::generate()));

        assert_eq!(effect, CartEffect::None);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_hydrate_replaces_instead_of_merging() {
        let user = UserId::generate();
        let items = vec![
            line(user, ProductId::generate(), 2, Some(1000)),
            line(user, ProductId::generate(), 3, Some(500)),
        ];
        let mut cart = CartState::new();
        cart.add_or_increment(line(user, ProductId::generate(), 9, Some(1)));

        cart.hydrate(Vec::new());
        cart.hydrate(items.clone());
        let once = cart.clone();
        cart.hydrate(items.clone());

        assert_eq!(cart.items(), items.as_slice());
        assert_eq!(cart, once);
    }

    #[test]
    fn test_derived_totals_after_hydrate() {
        let user = UserId::generate();
        let mut cart = CartState::new();
        cart.reduce(CartAction::Hydrate(vec![
            line(user, ProductId::generate(), 2, Some(1000)),
            line(user, ProductId::generate(), 3, Some(500)),
        ]));

        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), Price::from_cents(3500));
    }

    #[test]
    fn test_missing_snapshot_counts_as_free() {
        let user = UserId::generate();
        let mut cart = CartState::new();
        cart.hydrate(vec![
            line(user, ProductId::generate(), 2, None),
            line(user, ProductId::generate(), 1, Some(250)),
        ]);

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Price::from_cents(250));
    }

    #[test]
    fn test_clear_zeroes_totals() {
        let user = UserId::generate();
        let mut cart = CartState::new();
        cart.hydrate(vec![line(user, ProductId::generate(), 4, Some(1999))]);

        cart.reduce(CartAction::Clear);

        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.subtotal(), Price::ZERO);
    }

    #[test]
    fn test_flags() {
        let mut cart = CartState::new();
        assert!(!cart.is_open());

        cart.reduce(CartAction::ToggleVisible);
        assert!(cart.is_open());
        cart.reduce(CartAction::ToggleVisible);
        assert!(!cart.is_open());

        cart.reduce(CartAction::SetLoading(true));
        assert!(cart.is_loading());
    }

    #[test]
    fn test_quantity_classification() {
        assert_eq!(QuantityUpdate::from_requested(0), QuantityUpdate::Remove);
        assert_eq!(QuantityUpdate::from_requested(-1), QuantityUpdate::Remove);
        assert_eq!(QuantityUpdate::from_requested(2), QuantityUpdate::Set(qty(2)));
        assert_eq!(
            QuantityUpdate::from_requested(i64::MAX),
            QuantityUpdate::Set(qty(u32::MAX))
        );
    }
}
