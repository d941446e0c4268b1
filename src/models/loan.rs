//! Loan record model mirroring the loans collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Loan policy shared by client-side checks and document creation
pub const DEFAULT_LOAN_DURATION_DAYS: i64 = 14;

/// A loan document. Catalog and borrower fields are denormalized
/// snapshots taken at borrow time; they are never re-synced when the
/// source entities change later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    /// Backing-store document id, assigned at creation; not part of the
    /// document body itself.
    #[serde(skip)]
    pub id: String,
    pub book_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover: Option<String>,
    pub borrowed_by: String,
    pub borrowed_by_username: String,
    pub borrowed_by_email: String,
    pub borrowed_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub returned_at: Option<DateTime<Utc>>,
}

impl LoanRecord {
    /// A loan is active until `returned_at` is set; once set the loan is
    /// closed for good.
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn loan() -> LoanRecord {
        let borrowed_at = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        LoanRecord {
            id: "l1".into(),
            book_id: "b1".into(),
            title: "Neuromancer".into(),
            author: "William Gibson".into(),
            cover: None,
            borrowed_by: "u1".into(),
            borrowed_by_username: "case".into(),
            borrowed_by_email: "case@neon.example".into(),
            borrowed_at,
            due_date: Some(borrowed_at + Duration::days(14)),
            returned_at: None,
        }
    }

    #[test]
    fn test_active_until_returned() {
        let mut record = loan();
        assert!(record.is_active());
        record.returned_at = Some(record.borrowed_at + Duration::days(3));
        assert!(!record.is_active());
    }

    #[test]
    fn test_overdue_only_while_active() {
        let mut record = loan();
        let after_due = record.borrowed_at + Duration::days(20);
        assert!(record.is_overdue(after_due));
        assert!(!record.is_overdue(record.borrowed_at));
        record.returned_at = Some(after_due);
        assert!(!record.is_overdue(after_due));
    }

    #[test]
    fn test_document_field_names_are_camel_case() {
        let value = serde_json::to_value(loan()).unwrap();
        let fields = value.as_object().unwrap();
        assert!(fields.contains_key("bookId"));
        assert!(fields.contains_key("borrowedByUsername"));
        assert!(fields.contains_key("returnedAt"));
        // the document id lives outside the body
        assert!(!fields.contains_key("id"));
    }
}
