//! Per-session notice board.
//!
//! Background work (store writes, hydration) cannot return errors to the
//! request that triggered it, so failures are posted here and drained by the
//! client on its next poll of `/api/notices`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Notices kept per session before the oldest are dropped.
pub const MAX_PENDING_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A toast-style message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Bounded queue of pending notices. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    pending: Arc<Mutex<VecDeque<Notice>>>,
}

impl NoticeBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<Notice>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a notice, dropping the oldest when the board is full.
    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) {
        let mut pending = self.pending();
        while pending.len() >= MAX_PENDING_NOTICES {
            pending.pop_front();
        }
        pending.push_back(Notice {
            level,
            message: message.into(),
            at: Utc::now(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Take every pending notice, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        self.pending().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_board() {
        let board = NoticeBoard::new();
        board.error("Failed to save cart");
        board.push(NoticeLevel::Info, "Signed out");

        let drained = board.drain();

        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "Failed to save cart");
        assert_eq!(drained[1].level, NoticeLevel::Info);
        assert!(board.is_empty());
    }

    #[test]
    fn test_oldest_dropped_when_full() {
        let board = NoticeBoard::new();
        for i in 0..(MAX_PENDING_NOTICES + 5) {
            board.error(format!("notice {i}"));
        }

        let drained = board.drain();
        assert_eq!(drained.len(), MAX_PENDING_NOTICES);
        assert_eq!(drained[0].message, "notice 5");
    }

    #[test]
    fn test_clones_share_queue() {
        let board = NoticeBoard::new();
        let handle = board.clone();
        handle.error("boom");
        assert_eq!(board.len(), 1);
    }
}
