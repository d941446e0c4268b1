//! Wishlist repository over the backing-store primitives

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::{
    backend::{Document, DocumentBackend, DocumentSnapshot, Filter, SnapshotSink, Unsubscribe},
    error::{AppError, AppResult},
    models::{book::Book, user::SessionUser, wishlist::WishlistRecord},
};

pub const WISHLIST_COLLECTION: &str = "wishlists";

#[derive(Clone)]
pub struct WishlistRepository {
    backend: Arc<dyn DocumentBackend>,
}

impl WishlistRepository {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    fn to_record(snapshot: DocumentSnapshot) -> AppResult<WishlistRecord> {
        let mut record: WishlistRecord = serde_json::from_value(Value::Object(snapshot.fields))?;
        record.id = snapshot.id;
        Ok(record)
    }

    fn to_document(record: &WishlistRecord) -> AppResult<Document> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(fields),
            other => Err(AppError::Internal(format!(
                "wishlist entry serialized to non-object: {}",
                other
            ))),
        }
    }

    fn pair_filter(user_id: &str, book_id: &str) -> Filter {
        Filter::new()
            .field_eq("userId", user_id)
            .field_eq("bookId", book_id)
    }

    /// Add a book to a user's wishlist; at most one entry may exist per
    /// (user, book) pair, re-validated against the authoritative store.
    pub async fn add(&self, book: &Book, user: &SessionUser) -> AppResult<WishlistRecord> {
        let existing = self
            .backend
            .query_once(WISHLIST_COLLECTION, &Self::pair_filter(&user.id, &book.id))
            .await?;
        if !existing.is_empty() {
            return Err(AppError::AlreadyInWishlist(book.title.clone()));
        }

        let mut record = WishlistRecord {
            id: String::new(),
            book_id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            cover: book.cover.clone(),
            user_id: user.id.clone(),
            user_email: Some(user.email.clone()),
            user_display_name: Some(user.display_name.clone()),
            added_at: Utc::now(),
        };
        record.id = self
            .backend
            .create(WISHLIST_COLLECTION, Self::to_document(&record)?)
            .await?;
        Ok(record)
    }

    /// Remove every entry for the (user, book) pair
    pub async fn remove(&self, book_id: &str, user_id: &str) -> AppResult<()> {
        let entries = self
            .backend
            .query_once(WISHLIST_COLLECTION, &Self::pair_filter(user_id, book_id))
            .await?;
        for entry in entries {
            self.backend.delete(WISHLIST_COLLECTION, &entry.id).await?;
        }
        Ok(())
    }

    /// One-shot read of a user's wishlist
    pub async fn get_user_wishlist(&self, user_id: &str) -> AppResult<Vec<WishlistRecord>> {
        let entries = self
            .backend
            .query_once(
                WISHLIST_COLLECTION,
                &Filter::new().field_eq("userId", user_id),
            )
            .await?;
        entries.into_iter().map(Self::to_record).collect()
    }

    /// Live feed of a user's wishlist
    pub fn subscribe_user_wishlist(
        &self,
        user_id: &str,
        sink: impl Fn(Vec<WishlistRecord>) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let adapter: SnapshotSink = Arc::new(move |snapshots: Vec<DocumentSnapshot>| {
            let items: Vec<WishlistRecord> = snapshots
                .into_iter()
                .filter_map(|snapshot| match Self::to_record(snapshot) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping malformed wishlist document");
                        None
                    }
                })
                .collect();
            sink(items);
        });
        self.backend.subscribe(
            WISHLIST_COLLECTION,
            Filter::new().field_eq("userId", user_id),
            adapter,
        )
    }
}
