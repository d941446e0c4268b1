//! Wishlist management
//!
//! Same fail-fast/authoritative split as loans: the local snapshot
//! catches duplicates cheaply, the backing store re-checks at write
//! time.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, user::SessionUser, wishlist::WishlistRecord},
    repository::Repository,
    store::WishlistStore,
    subscriptions::{SubscriptionGuard, SubscriptionKey, SubscriptionRegistry},
};

#[derive(Clone)]
pub struct WishlistService {
    repository: Repository,
    store: Arc<WishlistStore>,
    registry: Arc<SubscriptionRegistry>,
}

impl WishlistService {
    pub fn new(
        repository: Repository,
        store: Arc<WishlistStore>,
        registry: Arc<SubscriptionRegistry>,
    ) -> Self {
        Self {
            repository,
            store,
            registry,
        }
    }

    pub async fn add(&self, book: &Book, user: &SessionUser) -> AppResult<WishlistRecord> {
        if self.store.is_book_in_wishlist(&book.id, &user.id) {
            return Err(AppError::AlreadyInWishlist(book.title.clone()));
        }

        let record = self.repository.wishlist.add(book, user).await?;
        tracing::info!(book_id = %book.id, user_id = %user.id, "book added to wishlist");
        Ok(record)
    }

    /// Removing a book that is not wishlisted is a no-op.
    pub async fn remove(&self, book_id: &str, user_id: &str) -> AppResult<()> {
        self.repository.wishlist.remove(book_id, user_id).await?;
        tracing::info!(book_id = %book_id, user_id = %user_id, "book removed from wishlist");
        Ok(())
    }

    /// Retain the per-user wishlist feed, wired into the store
    pub fn watch_user_wishlist(&self, user_id: &str) -> SubscriptionGuard {
        let repository = self.repository.wishlist.clone();
        let store = Arc::clone(&self.store);
        self.registry
            .retain(SubscriptionKey::UserWishlist(user_id.to_string()), move || {
                repository.subscribe_user_wishlist(user_id, move |items| store.set_items(items))
            })
    }

    pub fn is_book_in_wishlist(&self, book_id: &str, user_id: &str) -> bool {
        self.store.is_book_in_wishlist(book_id, user_id)
    }

    pub fn items(&self) -> Vec<WishlistRecord> {
        self.store.items()
    }

    pub fn store(&self) -> &Arc<WishlistStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockDocumentBackend;
    use chrono::Utc;

    fn record(book_id: &str, user_id: &str) -> WishlistRecord {
        WishlistRecord {
            id: "w1".into(),
            book_id: book_id.into(),
            title: "Neuromancer".into(),
            author: "William Gibson".into(),
            cover: None,
            user_id: user_id.into(),
            user_email: Some("case@neon.example".into()),
            user_display_name: Some("Case".into()),
            added_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_fails_fast_without_backend_roundtrip() {
        // no expectations set: any backend call panics the test
        let service = WishlistService::new(
            Repository::new(Arc::new(MockDocumentBackend::new())),
            Arc::new(WishlistStore::new()),
            Arc::new(SubscriptionRegistry::new()),
        );
        service.store.set_items(vec![record("b1", "u1")]);

        let book = Book {
            id: "b1".into(),
            title: "Neuromancer".into(),
            author: "William Gibson".into(),
            cover: None,
            year: Some(1984),
        };
        let user = SessionUser {
            id: "u1".into(),
            display_name: "Case".into(),
            email: "case@neon.example".into(),
            avatar_url: None,
        };
        let err = service.add(&book, &user).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyInWishlist(_)));
    }
}
