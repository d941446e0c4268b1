//! Service layer wiring
//!
//! `Services` owns the stores, the subscription registry and the
//! per-domain services, and exposes the session-aware facade used by
//! callers: operations that act on behalf of the signed-in user resolve
//! it here and fail with `NotAuthenticated` when nobody is signed in.

use std::sync::Arc;

use crate::{
    backend::{identity::IdentityProvider, DocumentBackend},
    config::AppConfig,
    enrichment,
    error::{AppError, AppResult},
    models::{
        book::{Book, EnrichedBook},
        loan::LoanRecord,
        user::SessionUser,
        wishlist::WishlistRecord,
    },
    repository::Repository,
    store::{LoanStore, WishlistStore},
    subscriptions::SubscriptionRegistry,
};

pub mod catalog;
pub mod loans;
pub mod notifications;
pub mod session;
pub mod wishlist;

use catalog::CatalogService;
use loans::LoansService;
use notifications::NotificationsService;
use session::SessionService;
use wishlist::WishlistService;

#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub loans: LoansService,
    pub wishlist: WishlistService,
    pub session: SessionService,
    pub subscriptions: Arc<SubscriptionRegistry>,
}

impl Services {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        identity: Arc<dyn IdentityProvider>,
        config: &AppConfig,
    ) -> Self {
        let repository = Repository::new(backend);
        let loan_store = Arc::new(LoanStore::new());
        let wishlist_store = Arc::new(WishlistStore::new());
        let subscriptions = Arc::new(SubscriptionRegistry::new());

        let notifications = NotificationsService::new(config.notifications.clone());
        let session = SessionService::new(identity);
        session.spawn_reset_watcher(
            Arc::clone(&loan_store),
            Arc::clone(&wishlist_store),
            Arc::clone(&subscriptions),
        );

        Self {
            catalog: CatalogService::new(config.catalog.clone()),
            loans: LoansService::new(
                repository.clone(),
                loan_store,
                Arc::clone(&subscriptions),
                notifications,
                &config.loans,
            ),
            wishlist: WishlistService::new(repository, wishlist_store, Arc::clone(&subscriptions)),
            session,
            subscriptions,
        }
    }

    fn require_user(&self) -> AppResult<SessionUser> {
        self.session.current_user().ok_or(AppError::NotAuthenticated)
    }

    /// Borrow `book` on behalf of the signed-in user
    pub async fn borrow_book(&self, book: &Book) -> AppResult<LoanRecord> {
        let user = self.require_user()?;
        self.loans.borrow(book, &user).await
    }

    pub async fn return_book(&self, loan_id: &str) -> AppResult<()> {
        self.require_user()?;
        self.loans.return_loan(loan_id).await
    }

    pub async fn add_to_wishlist(&self, book: &Book) -> AppResult<WishlistRecord> {
        let user = self.require_user()?;
        self.wishlist.add(book, &user).await
    }

    pub async fn remove_from_wishlist(&self, book_id: &str) -> AppResult<()> {
        let user = self.require_user()?;
        self.wishlist.remove(book_id, &user.id).await
    }

    /// Project catalog books through the current loan and wishlist
    /// snapshots. Pure over those snapshots; a signed-out session gets
    /// the anonymous projection.
    pub fn enrich_books(&self, books: &[Book]) -> Vec<EnrichedBook> {
        let user = self.session.current_user();
        enrichment::enrich_books(
            books,
            user.as_ref().map(|user| user.id.as_str()),
            &self.loans.store().snapshot(),
            &self.wishlist.store().snapshot(),
        )
    }
}
