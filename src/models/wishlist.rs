//! Wishlist record model mirroring the wishlists collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A wishlist document, at most one per (user, book) pair. Created by
/// "add to wishlist", deleted by "remove", never mutated otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRecord {
    /// Backing-store document id; not part of the document body.
    #[serde(skip)]
    pub id: String,
    pub book_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover: Option<String>,
    pub user_id: String,
    /// Snapshot used by the notification endpoint to reach the user
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_display_name: Option<String>,
    pub added_at: DateTime<Utc>,
}
