//! Background persistence of cart changes.
//!
//! Local cart state changes first; the matching store write runs on a spawned
//! task and never blocks or rolls back the caller.
//!
//! Writes are serialized per `(user, product)`, the key the store keeps unique.
//! While a write for a product is in flight, later writes for it wait in a
//! backlog: removals of earlier lines run first, in dispatch order, followed
//! by the newest save. Because every save carries an absolute quantity, the
//! store always ends up holding the last value the shopper asked for, even
//! when a product is removed and added back under a fresh line ID. Writes for
//! different products run independently.
//!
//! A failed write is logged and posted to the session's [`NoticeBoard`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use neonmart_core::cart::{CartEffect, CartLineItem};
use neonmart_core::{CartItemId, ProductId, UserId};

use super::notices::NoticeBoard;
use crate::db::CartStore;

/// Writes to the store are ordered per line key.
pub type LineKey = (UserId, ProductId);

/// A store write for one cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    Save(CartLineItem),
    /// Delete the stored row for this (removed) line.
    Delete(CartLineItem),
}

impl PendingWrite {
    /// The write a reduction requires, if any.
    #[must_use]
    pub fn from_effect(effect: CartEffect) -> Option<Self> {
        match effect {
            CartEffect::None => None,
            CartEffect::Persist(line) => Some(Self::Save(line)),
            CartEffect::Delete(line) => Some(Self::Delete(line)),
        }
    }

    #[must_use]
    pub const fn line(&self) -> &CartLineItem {
        match self {
            Self::Save(line) | Self::Delete(line) => line,
        }
    }

    #[must_use]
    pub const fn item_id(&self) -> CartItemId {
        self.line().id
    }

    #[must_use]
    pub const fn key(&self) -> LineKey {
        let line = self.line();
        (line.user_id, line.product_id)
    }

    const fn failure_notice(&self) -> &'static str {
        match self {
            Self::Save(_) => "We couldn't save your cart change. It will be lost when you sign out.",
            Self::Delete(_) => "We couldn't remove that item from your saved cart.",
        }
    }
}

struct Queued {
    write: PendingWrite,
    notices: NoticeBoard,
}

/// Writes waiting behind the in-flight write for one key.
#[derive(Default)]
struct Backlog {
    /// One entry per removed line ID, oldest first.
    deletes: VecDeque<Queued>,
    /// Only the newest save matters.
    save: Option<Queued>,
}

impl Backlog {
    fn push(&mut self, queued: Queued) {
        match &queued.write {
            PendingWrite::Save(_) => self.save = Some(queued),
            PendingWrite::Delete(line) => {
                let id = line.id;
                if self.save.as_ref().is_some_and(|s| s.write.item_id() == id) {
                    self.save = None;
                }
                if !self.deletes.iter().any(|d| d.write.item_id() == id) {
                    self.deletes.push_back(queued);
                }
            }
        }
    }

    fn pop(&mut self) -> Option<Queued> {
        self.deletes.pop_front().or_else(|| self.save.take())
    }

    fn len(&self) -> usize {
        self.deletes.len() + usize::from(self.save.is_some())
    }
}

/// Keys with a write in flight, each with the writes waiting behind it.
type Slots = HashMap<LineKey, Backlog>;

/// Per-product serializing writer over a [`CartStore`].
pub struct CartSync<S> {
    store: Arc<S>,
    slots: Arc<Mutex<Slots>>,
    idle: Arc<Notify>,
}

impl<S> Clone for CartSync<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            slots: Arc::clone(&self.slots),
            idle: Arc::clone(&self.idle),
        }
    }
}

impl<S: CartStore> CartSync<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            slots: Arc::new(Mutex::new(HashMap::new())),
            idle: Arc::new(Notify::new()),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue the write for `effect` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, effect: CartEffect, notices: &NoticeBoard) {
        let Some(write) = PendingWrite::from_effect(effect) else {
            return;
        };
        let key = write.key();
        let queued = Queued {
            write,
            notices: notices.clone(),
        };

        {
            let mut slots = self.slots();
            match slots.entry(key) {
                Entry::Occupied(mut slot) => {
                    tracing::debug!(
                        item_id = %queued.write.item_id(),
                        product_id = %key.1,
                        "Queueing cart write behind in-flight write"
                    );
                    slot.get_mut().push(queued);
                    return;
                }
                Entry::Vacant(slot) => {
                    slot.insert(Backlog::default());
                }
            }
        }

        let sync = self.clone();
        tokio::spawn(async move { sync.drain(key, queued).await });
    }

    /// Number of products with a write in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.slots().len()
    }

    /// Number of writes waiting behind in-flight ones.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.slots().values().map(Backlog::len).sum()
    }

    /// Wait until no writes are in flight.
    pub async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let empty = self.slots().is_empty();
            if empty {
                return;
            }
            notified.await;
        }
    }

    async fn drain(self, key: LineKey, mut current: Queued) {
        loop {
            self.apply(current).await;

            let next = {
                let mut slots = self.slots();
                let next = slots.get_mut(&key).and_then(Backlog::pop);
                if next.is_none() {
                    slots.remove(&key);
                    if slots.is_empty() {
                        self.idle.notify_waiters();
                    }
                }
                next
            };

            match next {
                Some(queued) => current = queued,
                None => return,
            }
        }
    }

    async fn apply(&self, queued: Queued) {
        let result = match &queued.write {
            PendingWrite::Save(line) => self.store.save_line(line).await,
            PendingWrite::Delete(line) => self.store.delete_line(line.id).await,
        };

        if let Err(e) = result {
            tracing::error!(
                item_id = %queued.write.item_id(),
                error = %e,
                "Failed to persist cart change"
            );
            queued.notices.error(queued.write.failure_notice());
        }
    }
}
