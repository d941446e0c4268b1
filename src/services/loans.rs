//! Loan lifecycle coordination
//!
//! Borrow and return are conditionally-safe operations. The local store
//! provides a fail-fast precondition check; the backing store performs
//! the authoritative re-validation at write time, because other
//! operations may interleave between the check and the write. Success
//! does not imply the local cache already reflects the write: it
//! converges when the live feed pushes the next snapshot.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    config::LoanPolicyConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookAvailability},
        loan::LoanRecord,
        user::SessionUser,
    },
    repository::Repository,
    services::notifications::{BookAvailableNotice, NotificationsService},
    store::LoanStore,
    subscriptions::{SubscriptionGuard, SubscriptionKey, SubscriptionRegistry},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    store: Arc<LoanStore>,
    registry: Arc<SubscriptionRegistry>,
    notifications: NotificationsService,
    loan_duration: Duration,
}

impl LoansService {
    pub fn new(
        repository: Repository,
        store: Arc<LoanStore>,
        registry: Arc<SubscriptionRegistry>,
        notifications: NotificationsService,
        policy: &LoanPolicyConfig,
    ) -> Self {
        Self {
            repository,
            store,
            registry,
            notifications,
            loan_duration: Duration::days(policy.duration_days),
        }
    }

    /// Borrow `book` for `user`.
    ///
    /// The returned record is authoritative, but the local store may not
    /// reflect it yet; callers must rely on the live feed for
    /// convergence rather than reading the cache right after this call.
    pub async fn borrow(&self, book: &Book, user: &SessionUser) -> AppResult<LoanRecord> {
        if let Some(active) = self.store.active_loan_for_book(&book.id) {
            if active.borrowed_by == user.id {
                return Err(AppError::AlreadyBorrowedByUser(book.title.clone()));
            }
            return Err(AppError::AlreadyBorrowed(book.title.clone()));
        }

        let record = self
            .repository
            .loans
            .create(book, user, self.loan_duration)
            .await?;
        tracing::info!(
            loan_id = %record.id,
            book_id = %book.id,
            user_id = %user.id,
            "book borrowed"
        );
        Ok(record)
    }

    /// Return a loan by id.
    ///
    /// The wishlist notification is a post-commit side effect; its
    /// failure never fails the return.
    pub async fn return_loan(&self, loan_id: &str) -> AppResult<()> {
        let record = self.repository.loans.mark_returned(loan_id).await?;
        tracing::info!(loan_id = %record.id, book_id = %record.book_id, "book returned");

        self.notifications.notify_book_available(BookAvailableNotice {
            book_id: record.book_id,
            book_title: record.title,
            book_author: record.author,
            exclude_user_id: Some(record.borrowed_by),
        });
        Ok(())
    }

    /// Retain the shared "all active loans" feed, wired into the store
    pub fn watch_active_loans(&self) -> SubscriptionGuard {
        let repository = self.repository.loans.clone();
        let store = Arc::clone(&self.store);
        self.registry.retain(SubscriptionKey::ActiveLoans, move || {
            repository.subscribe_active_loans(move |loans| store.set_loans(loans))
        })
    }

    /// Retain the per-user loans feed, wired into the store
    pub fn watch_user_loans(&self, user_id: &str) -> SubscriptionGuard {
        let repository = self.repository.loans.clone();
        let store = Arc::clone(&self.store);
        self.registry
            .retain(SubscriptionKey::UserLoans(user_id.to_string()), move || {
                repository.subscribe_user_loans(user_id, move |loans| store.set_user_loans(loans))
            })
    }

    pub fn get_book_availability(&self, book_id: &str) -> BookAvailability {
        self.store.get_book_availability(book_id)
    }

    pub fn is_book_borrowed_by_user(&self, book_id: &str, user_id: &str) -> bool {
        self.store.is_book_borrowed_by_user(book_id, user_id)
    }

    /// Active loans of the current user, per the latest feed snapshot
    pub fn user_loans(&self) -> Vec<LoanRecord> {
        self.store.user_loans()
    }

    /// Full borrow history of the current user, newest first
    pub fn loan_history(&self) -> Vec<LoanRecord> {
        self.store.loan_history()
    }

    pub fn store(&self) -> &Arc<LoanStore> {
        &self.store
    }
}
