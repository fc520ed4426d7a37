//! Analytics event tracking.
//!
//! Tracking never fails the request that triggered it: inserts run on a
//! spawned task and errors are only logged.

use std::sync::Arc;

use neonmart_core::analytics::NewAnalyticsEvent;

use crate::db::analytics::AnalyticsRepository;
use crate::db::memory::InMemoryStore;

#[derive(Clone)]
enum Sink {
    Disabled,
    Postgres(AnalyticsRepository),
    Memory(Arc<InMemoryStore>),
}

/// Fire-and-forget event recorder.
#[derive(Clone)]
pub struct AnalyticsTracker {
    sink: Sink,
}

impl AnalyticsTracker {
    #[must_use]
    pub const fn new(repository: AnalyticsRepository) -> Self {
        Self {
            sink: Sink::Postgres(repository),
        }
    }

    /// A tracker that drops every event.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
        }
    }

    /// A tracker that records into `store` before `track` returns.
    #[must_use]
    pub const fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            sink: Sink::Memory(store),
        }
    }

    /// Record `event` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&self, event: NewAnalyticsEvent) {
        match &self.sink {
            Sink::Disabled => {
                tracing::trace!(event_type = %event.event_type, "Analytics disabled, dropping event");
            }
            Sink::Memory(store) => {
                store.record_event(event);
            }
            Sink::Postgres(repository) => {
                let repository = repository.clone();
                tokio::spawn(async move {
                    if let Err(e) = repository.insert(&event).await {
                        tracing::warn!(
                            event_type = %event.event_type,
                            error = %e,
                            "Failed to record analytics event"
                        );
                    }
                });
            }
        }
    }
}
