//! In-memory wishlist record store

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::models::wishlist::WishlistRecord;

/// Point-in-time view of the wishlist store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishlistSnapshot {
    /// The current user's wishlist entries
    pub items: Vec<WishlistRecord>,
}

pub struct WishlistStore {
    state: RwLock<WishlistSnapshot>,
    revision: watch::Sender<u64>,
}

impl WishlistStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(WishlistSnapshot::default()),
            revision: watch::channel(0).0,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, WishlistSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WishlistSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Changes whenever a snapshot is replaced
    pub fn revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision_stream(&self) -> WatchStream<u64> {
        WatchStream::new(self.revision.subscribe())
    }

    /// Replace the snapshot with the latest feed delivery
    pub fn set_items(&self, items: Vec<WishlistRecord>) {
        self.write().items = items;
        self.bump();
    }

    pub fn snapshot(&self) -> WishlistSnapshot {
        self.read().clone()
    }

    pub fn is_book_in_wishlist(&self, book_id: &str, user_id: &str) -> bool {
        self.read()
            .items
            .iter()
            .any(|item| item.book_id == book_id && item.user_id == user_id)
    }

    pub fn items(&self) -> Vec<WishlistRecord> {
        self.read().items.clone()
    }

    /// Clear everything; part of the session teardown contract
    pub fn reset(&self) {
        *self.write() = WishlistSnapshot::default();
        self.bump();
    }
}

impl Default for WishlistStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(book_id: &str) -> WishlistRecord {
        WishlistRecord {
            id: format!("w-{}", book_id),
            book_id: book_id.into(),
            title: "Snow Crash".into(),
            author: "Neal Stephenson".into(),
            cover: None,
            user_id: "u1".into(),
            user_email: Some("case@neon.example".into()),
            user_display_name: Some("Case".into()),
            added_at: Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_membership_follows_snapshot() {
        let store = WishlistStore::new();
        assert!(!store.is_book_in_wishlist("b1", "u1"));

        store.set_items(vec![item("b1")]);
        assert!(store.is_book_in_wishlist("b1", "u1"));

        store.set_items(vec![item("b2")]);
        assert!(!store.is_book_in_wishlist("b1", "u1"));
        assert!(store.is_book_in_wishlist("b2", "u1"));
    }

    #[test]
    fn test_membership_is_scoped_to_the_owning_user() {
        let store = WishlistStore::new();
        store.set_items(vec![item("b1")]);
        assert!(store.is_book_in_wishlist("b1", "u1"));
        assert!(!store.is_book_in_wishlist("b1", "u2"));
    }

    #[test]
    fn test_reset_clears_items() {
        let store = WishlistStore::new();
        store.set_items(vec![item("b1")]);
        store.reset();
        assert!(store.items().is_empty());
    }
}
