//! In-memory loan record store
//!
//! Mirrors the loans collection as pushed by the live feeds. Every push
//! is authoritative and total for its scope: it replaces, never merges
//! with, the prior snapshot.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::models::book::BookAvailability;
use crate::models::loan::LoanRecord;

/// Point-in-time view of the loan store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanSnapshot {
    /// Active loans across all users (the "active-loans" feed scope)
    pub loans: Vec<LoanRecord>,
    /// Every loan of the current user, active and returned
    pub user_loans: Vec<LoanRecord>,
}

pub struct LoanStore {
    state: RwLock<LoanSnapshot>,
    revision: watch::Sender<u64>,
}

impl LoanStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LoanSnapshot::default()),
            revision: watch::channel(0).0,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LoanSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LoanSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Changes whenever a snapshot is replaced; selectors should be
    /// re-evaluated on every new value.
    pub fn revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Stream form of [`LoanStore::revision`] for UI update loops
    pub fn revision_stream(&self) -> WatchStream<u64> {
        WatchStream::new(self.revision.subscribe())
    }

    pub fn set_loans(&self, loans: Vec<LoanRecord>) {
        self.write().loans = loans;
        self.bump();
    }

    pub fn set_user_loans(&self, loans: Vec<LoanRecord>) {
        self.write().user_loans = loans;
        self.bump();
    }

    pub fn snapshot(&self) -> LoanSnapshot {
        self.read().clone()
    }

    pub fn get_book_availability(&self, book_id: &str) -> BookAvailability {
        if self.active_loan_for_book(book_id).is_some() {
            BookAvailability::Borrowed
        } else {
            BookAvailability::Available
        }
    }

    pub fn active_loan_for_book(&self, book_id: &str) -> Option<LoanRecord> {
        self.read()
            .loans
            .iter()
            .find(|loan| loan.book_id == book_id && loan.is_active())
            .cloned()
    }

    pub fn is_book_borrowed_by_user(&self, book_id: &str, user_id: &str) -> bool {
        self.read()
            .loans
            .iter()
            .any(|loan| loan.book_id == book_id && loan.borrowed_by == user_id && loan.is_active())
    }

    /// Active loans of the current user
    pub fn user_loans(&self) -> Vec<LoanRecord> {
        self.read()
            .user_loans
            .iter()
            .filter(|loan| loan.is_active())
            .cloned()
            .collect()
    }

    /// Full borrow history of the current user, as delivered by the feed
    /// (newest first)
    pub fn loan_history(&self) -> Vec<LoanRecord> {
        self.read().user_loans.clone()
    }

    /// Clear everything; part of the session teardown contract
    pub fn reset(&self) {
        *self.write() = LoanSnapshot::default();
        self.bump();
    }
}

impl Default for LoanStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tokio_stream::StreamExt;

    fn loan(id: &str, book_id: &str, user_id: &str, returned: bool) -> LoanRecord {
        let borrowed_at = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        LoanRecord {
            id: id.into(),
            book_id: book_id.into(),
            title: "Neuromancer".into(),
            author: "William Gibson".into(),
            cover: None,
            borrowed_by: user_id.into(),
            borrowed_by_username: "case".into(),
            borrowed_by_email: "case@neon.example".into(),
            borrowed_at,
            due_date: Some(borrowed_at + Duration::days(14)),
            returned_at: returned.then(|| borrowed_at + Duration::days(3)),
        }
    }

    #[test]
    fn test_availability_tracks_active_loans() {
        let store = LoanStore::new();
        assert_eq!(store.get_book_availability("b1"), BookAvailability::Available);

        store.set_loans(vec![loan("l1", "b1", "u1", false)]);
        assert_eq!(store.get_book_availability("b1"), BookAvailability::Borrowed);
        assert!(store.is_book_borrowed_by_user("b1", "u1"));
        assert!(!store.is_book_borrowed_by_user("b1", "u2"));
    }

    #[test]
    fn test_pushes_replace_not_merge() {
        let store = LoanStore::new();
        store.set_loans(vec![loan("l1", "b1", "u1", false)]);
        store.set_loans(vec![loan("l2", "b2", "u2", false)]);

        assert_eq!(store.get_book_availability("b1"), BookAvailability::Available);
        assert_eq!(store.get_book_availability("b2"), BookAvailability::Borrowed);
    }

    #[test]
    fn test_user_loans_filters_returned() {
        let store = LoanStore::new();
        store.set_user_loans(vec![loan("l1", "b1", "u1", true), loan("l2", "b2", "u1", false)]);

        let active = store.user_loans();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "l2");
        assert_eq!(store.loan_history().len(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = LoanStore::new();
        store.set_loans(vec![loan("l1", "b1", "u1", false)]);
        store.set_user_loans(vec![loan("l1", "b1", "u1", false)]);
        store.reset();

        assert_eq!(store.snapshot(), LoanSnapshot::default());
    }

    #[tokio::test]
    async fn test_revision_stream_observes_updates() {
        let store = LoanStore::new();
        let mut revisions = store.revision_stream();
        assert_eq!(revisions.next().await, Some(0));

        store.set_loans(vec![loan("l1", "b1", "u1", false)]);
        assert_eq!(revisions.next().await, Some(1));
    }
}
