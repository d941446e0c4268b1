//! Catalog projection over record-store snapshots
//!
//! Pure functions: identical snapshots and inputs always yield identical
//! output, so callers can recompute on every store revision without any
//! caching concerns.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::book::{Book, BookAvailability, EnrichedBook};
use crate::models::loan::DEFAULT_LOAN_DURATION_DAYS;
use crate::store::{LoanSnapshot, WishlistSnapshot};

/// Join catalog entries against the loan and wishlist snapshots,
/// computing the effective status for the given user (or an anonymous
/// view when `current_user_id` is `None`).
pub fn enrich_books(
    books: &[Book],
    current_user_id: Option<&str>,
    loans: &LoanSnapshot,
    wishlist: &WishlistSnapshot,
) -> Vec<EnrichedBook> {
    books
        .iter()
        .map(|book| {
            let active_loan = loans
                .loans
                .iter()
                .find(|loan| loan.book_id == book.id && loan.is_active());

            let internal_status = if active_loan.is_some() {
                BookAvailability::Borrowed
            } else {
                BookAvailability::Available
            };
            let is_borrowed_by_current_user = match (active_loan, current_user_id) {
                (Some(loan), Some(user_id)) => loan.borrowed_by == user_id,
                _ => false,
            };
            let is_borrowable =
                internal_status == BookAvailability::Available && current_user_id.is_some();
            let is_in_wishlist = current_user_id
                .map(|user_id| {
                    wishlist
                        .items
                        .iter()
                        .any(|item| item.book_id == book.id && item.user_id == user_id)
                })
                .unwrap_or(false);

            EnrichedBook {
                book: book.clone(),
                internal_status,
                is_borrowed_by_current_user,
                is_borrowable,
                is_in_wishlist,
            }
        })
        .collect()
}

/// Display state of a loan at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

/// Display model for a loan history row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanHistoryEntry {
    pub status: LoanStatus,
    pub days_until_due: i64,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
}

/// Format a loan for history display, evaluated at `now`.
///
/// A missing due date falls back to the 14-day policy from the loan
/// date; `days_until_due` rounds up, so a due date later today still
/// counts as one remaining day.
pub fn format_loan_history(
    loan_date: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    returned_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LoanHistoryEntry {
    let due_date = due_date.unwrap_or(loan_date + Duration::days(DEFAULT_LOAN_DURATION_DAYS));
    let remaining = due_date - now;
    let days_until_due = (remaining.num_seconds() as f64 / 86_400.0).ceil() as i64;

    let status = if returned_date.is_some() {
        LoanStatus::Returned
    } else if days_until_due < 0 {
        LoanStatus::Overdue
    } else {
        LoanStatus::Active
    };

    LoanHistoryEntry {
        status,
        days_until_due,
        loan_date,
        due_date,
        returned_date,
    }
}
