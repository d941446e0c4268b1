//! Data models for the Neon Archive client core

pub mod book;
pub mod loan;
pub mod user;
pub mod wishlist;

// Re-export commonly used types
pub use book::{Book, BookAvailability, EnrichedBook, WorkDetails};
pub use loan::LoanRecord;
pub use user::SessionUser;
pub use wishlist::WishlistRecord;
