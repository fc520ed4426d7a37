//! In-memory store for tests.
//!
//! Mirrors the `PostgreSQL` behaviour the cart services rely on: lines joined
//! with the current product on read, newest first, and the
//! `(user_id, product_id)` uniqueness constraint on write. Reads, writes and
//! deletes can be held back or made to fail so ordering and failure handling
//! can be observed. Analytics events are recorded as they are tracked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;

use neonmart_core::analytics::{AnalyticsEvent, NewAnalyticsEvent};
use neonmart_core::cart::CartLineItem;
use neonmart_core::{AnalyticsEventId, CartItemId, ProductId, UserId};

use super::{CartStore, ProductCatalog, RepositoryError};
use crate::models::product::{Product, ProductFilter};

/// A write as it reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Save { id: CartItemId, quantity: u32 },
    Delete(CartItemId),
}

#[derive(Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    lines: HashMap<CartItemId, CartLineItem>,
    writes: Vec<StoreWrite>,
    events: Vec<AnalyticsEvent>,
}

/// Thread-safe in-memory [`CartStore`] and [`ProductCatalog`].
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    cart_reads: AtomicUsize,
    reads_paused: watch::Sender<bool>,
    writes_paused: watch::Sender<bool>,
    deletes_paused: watch::Sender<bool>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            cart_reads: AtomicUsize::new(0),
            reads_paused: watch::Sender::new(false),
            writes_paused: watch::Sender::new(false),
            deletes_paused: watch::Sender::new(false),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a catalog product.
    pub fn insert_product(&self, product: Product) {
        self.tables().products.insert(product.id, product);
    }

    /// Seed a persisted cart line without recording a write.
    pub fn insert_line(&self, line: CartLineItem) {
        self.tables().lines.insert(line.id, line);
    }

    /// Stored line by ID.
    #[must_use]
    pub fn line(&self, id: CartItemId) -> Option<CartLineItem> {
        self.tables().lines.get(&id).cloned()
    }

    /// Number of stored lines across all users.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.tables().lines.len()
    }

    /// Every applied write, in the order it was applied.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.tables().writes.clone()
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of cart reads (`list_for_user` calls) so far.
    #[must_use]
    pub fn cart_reads(&self) -> usize {
        self.cart_reads.load(Ordering::SeqCst)
    }

    /// Hold cart reads until [`resume_reads`](Self::resume_reads) is called.
    pub fn pause_reads(&self) {
        self.reads_paused.send_replace(true);
    }

    pub fn resume_reads(&self) {
        self.reads_paused.send_replace(false);
    }

    /// Hold saves and deletes until [`resume_writes`](Self::resume_writes) is called.
    pub fn pause_writes(&self) {
        self.writes_paused.send_replace(true);
    }

    pub fn resume_writes(&self) {
        self.writes_paused.send_replace(false);
    }

    /// Hold deletes only; saves go through.
    pub fn pause_deletes(&self) {
        self.deletes_paused.send_replace(true);
    }

    pub fn resume_deletes(&self) {
        self.deletes_paused.send_replace(false);
    }

    /// Record a tracked event, stamped now.
    pub fn record_event(&self, event: NewAnalyticsEvent) -> AnalyticsEvent {
        let recorded = AnalyticsEvent {
            id: AnalyticsEventId::generate(),
            event_type: event.event_type,
            user_id: event.user_id,
            product_id: event.product_id,
            session_id: event.session_id,
            metadata: event.metadata,
            created_at: Utc::now(),
        };
        self.tables().events.push(recorded.clone());
        recorded
    }

    /// Every recorded analytics event, oldest first.
    #[must_use]
    pub fn analytics_events(&self) -> Vec<AnalyticsEvent> {
        self.tables().events.clone()
    }

    async fn write_gate(&self, extra: Option<&watch::Sender<bool>>) -> Result<(), RepositoryError> {
        wait_unpaused(&self.writes_paused).await;
        if let Some(paused) = extra {
            wait_unpaused(paused).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

async fn wait_unpaused(paused: &watch::Sender<bool>) {
    let mut paused = paused.subscribe();
    // The sender lives as long as the store, so this cannot observe a closed channel.
    let _ = paused.wait_for(|held| !*held).await;
}

impl CartStore for InMemoryStore {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartLineItem>, RepositoryError> {
        self.cart_reads.fetch_add(1, Ordering::SeqCst);
        wait_unpaused(&self.reads_paused).await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let tables = self.tables();
        let mut lines: Vec<CartLineItem> = tables
            .lines
            .values()
            .filter(|line| line.user_id == user_id)
            .map(|line| CartLineItem {
                product: tables.products.get(&line.product_id).map(Product::snapshot),
                ..line.clone()
            })
            .collect();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(lines)
    }

    async fn save_line(&self, line: &CartLineItem) -> Result<(), RepositoryError> {
        self.write_gate(None).await?;

        let mut tables = self.tables();
        let duplicate = tables.lines.values().any(|existing| {
            existing.id != line.id
                && existing.user_id == line.user_id
                && existing.product_id == line.product_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "product {} is already in the cart under another line",
                line.product_id
            )));
        }

        tables.lines.insert(line.id, line.clone());
        tables.writes.push(StoreWrite::Save {
            id: line.id,
            quantity: line.quantity.get(),
        });
        Ok(())
    }

    async fn delete_line(&self, id: CartItemId) -> Result<(), RepositoryError> {
        self.write_gate(Some(&self.deletes_paused)).await?;

        let mut tables = self.tables();
        tables.lines.remove(&id);
        tables.writes.push(StoreWrite::Delete(id));
        Ok(())
    }
}

impl ProductCatalog for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables().products.get(&id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let products: Vec<Product> = self.tables().products.values().cloned().collect();
        Ok(filter.apply(products))
    }
}
