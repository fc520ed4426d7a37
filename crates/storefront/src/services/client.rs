//! Client sessions and their registry.
//!
//! A [`ClientSession`] owns the cart and theme state for one browser session.
//! Sessions live in a bounded [`ClientRegistry`] keyed by the [`ClientId`]
//! stored in the HTTP session cookie, and are evicted after sitting idle for
//! the configured TTL.

use std::sync::Arc;

use moka::future::Cache;
use tokio::sync::{Mutex, MutexGuard};

use neonmart_core::cart::CartState;
use neonmart_core::theme::ThemeState;
use neonmart_core::{ClientId, UserId};

use super::notices::NoticeBoard;
use crate::config::ClientStateConfig;

/// State guarded by a session's lock.
#[derive(Debug, Default)]
pub struct ClientState {
    pub cart: CartState,
    pub theme: ThemeState,
    /// User the cart was last hydrated for. `None` until the first load and
    /// after sign-out.
    pub hydrated_for: Option<UserId>,
}

/// One browser session's client state.
#[derive(Debug)]
pub struct ClientSession {
    id: ClientId,
    state: Mutex<ClientState>,
    /// Held for the whole of a cart hydration, store read included.
    hydration: Mutex<()>,
    notices: NoticeBoard,
}

impl ClientSession {
    #[must_use]
    pub fn new(id: ClientId, theme: ThemeState) -> Self {
        Self {
            id,
            state: Mutex::new(ClientState {
                theme,
                ..ClientState::default()
            }),
            hydration: Mutex::new(()),
            notices: NoticeBoard::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Lock the session state.
    ///
    /// Hold the guard only for synchronous reductions, never across store I/O.
    pub async fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().await
    }

    /// Serialize cart hydrations for this session.
    ///
    /// Unlike [`lock`](Self::lock), this guard may be held across store I/O.
    /// It must be taken before the state lock, never while holding it.
    pub async fn hydration(&self) -> MutexGuard<'_, ()> {
        self.hydration.lock().await
    }

    #[must_use]
    pub const fn notices(&self) -> &NoticeBoard {
        &self.notices
    }
}

/// Bounded, idle-expiring map of client sessions.
#[derive(Clone)]
pub struct ClientRegistry {
    cache: Cache<ClientId, Arc<ClientSession>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(config: &ClientStateConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_clients)
            .time_to_idle(config.idle_timeout)
            .build();

        Self { cache }
    }

    /// Get the session for `id`, creating it with `theme` if absent.
    ///
    /// Concurrent callers for the same ID receive the same session.
    pub async fn get_or_create(
        &self,
        id: ClientId,
        theme: impl FnOnce() -> ThemeState + Send,
    ) -> Arc<ClientSession> {
        self.cache
            .get_with(id, async move { Arc::new(ClientSession::new(id, theme())) })
            .await
    }

    pub async fn get(&self, id: ClientId) -> Option<Arc<ClientSession>> {
        self.cache.get(&id).await
    }

    pub async fn remove(&self, id: ClientId) {
        self.cache.invalidate(&id).await;
    }

    /// Approximate number of live sessions.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
