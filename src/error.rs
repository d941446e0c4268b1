//! Error types for the Neon Archive client core

use serde::Serialize;
use thiserror::Error;

/// Stable error codes surfaced to the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthenticated = 2,
    BackendFailure = 3,
    AlreadyBorrowed = 4,
    AlreadyBorrowedByUser = 5,
    AlreadyReturned = 6,
    LoanNotFound = 7,
    AlreadyInWishlist = 8,
    Cancelled = 9,
    BadValue = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("\"{0}\" is already borrowed")]
    AlreadyBorrowed(String),

    #[error("you already borrowed \"{0}\"")]
    AlreadyBorrowedByUser(String),

    #[error("loan {0} is already returned")]
    AlreadyReturned(String),

    #[error("loan {0} not found")]
    LoanNotFound(String),

    #[error("\"{0}\" is already in the wishlist")]
    AlreadyInWishlist(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("request cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code for UI consumption
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::AlreadyBorrowed(_) => ErrorCode::AlreadyBorrowed,
            AppError::AlreadyBorrowedByUser(_) => ErrorCode::AlreadyBorrowedByUser,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::LoanNotFound(_) => ErrorCode::LoanNotFound,
            AppError::AlreadyInWishlist(_) => ErrorCode::AlreadyInWishlist,
            AppError::Authentication(_) | AppError::NotAuthenticated => ErrorCode::NotAuthenticated,
            AppError::Cancelled => ErrorCode::Cancelled,
            AppError::Backend(_) | AppError::Http(_) => ErrorCode::BackendFailure,
            AppError::Config(_) | AppError::Serialization(_) => ErrorCode::BadValue,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    /// Expected business-rule failure: shown to the user as a transient
    /// notification, never retried automatically.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::AlreadyBorrowed(_)
                | AppError::AlreadyBorrowedByUser(_)
                | AppError::AlreadyReturned(_)
                | AppError::LoanNotFound(_)
                | AppError::AlreadyInWishlist(_)
        )
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
