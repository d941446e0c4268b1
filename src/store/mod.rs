//! Session-scoped record stores
//!
//! Process-wide caches holding the latest snapshot pushed by the live
//! feeds. All queries are synchronous reads over the current snapshot;
//! both stores are rebuilt from empty at session teardown.

pub mod loans;
pub mod wishlist;

pub use loans::{LoanSnapshot, LoanStore};
pub use wishlist::{WishlistSnapshot, WishlistStore};
