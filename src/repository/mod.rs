//! Repository layer over the backing-store primitives

pub mod loans;
pub mod wishlist;

use std::sync::Arc;

use crate::backend::DocumentBackend;

/// Main repository struct holding the backing-store handle
#[derive(Clone)]
pub struct Repository {
    pub loans: loans::LoansRepository,
    pub wishlist: wishlist::WishlistRepository,
}

impl Repository {
    /// Create a new repository over the given backend
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            loans: loans::LoansRepository::new(Arc::clone(&backend)),
            wishlist: wishlist::WishlistRepository::new(backend),
        }
    }
}
