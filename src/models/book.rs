//! Catalog entry models

use serde::{Deserialize, Serialize};

/// A catalog entry as delivered by the book-metadata API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Effective loan status of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookAvailability {
    Available,
    Borrowed,
}

/// A catalog entry joined against the loan and wishlist stores
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBook {
    #[serde(flatten)]
    pub book: Book,
    pub internal_status: BookAvailability,
    pub is_borrowed_by_current_user: bool,
    pub is_borrowable: bool,
    pub is_in_wishlist: bool,
}

/// Full work detail from the catalog metadata API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkDetails {
    pub title: String,
    pub description: Option<String>,
    pub subjects: Vec<String>,
}
