//! Loans repository over the backing-store primitives

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;

use crate::{
    backend::{Document, DocumentBackend, DocumentSnapshot, Filter, SnapshotSink, Unsubscribe},
    error::{AppError, AppResult},
    models::{book::Book, loan::LoanRecord, user::SessionUser},
};

pub const LOANS_COLLECTION: &str = "loans";

#[derive(Clone)]
pub struct LoansRepository {
    backend: Arc<dyn DocumentBackend>,
}

impl LoansRepository {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    fn to_record(snapshot: DocumentSnapshot) -> AppResult<LoanRecord> {
        let mut record: LoanRecord = serde_json::from_value(Value::Object(snapshot.fields))?;
        record.id = snapshot.id;
        Ok(record)
    }

    fn to_document(record: &LoanRecord) -> AppResult<Document> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(fields),
            other => Err(AppError::Internal(format!(
                "loan serialized to non-object: {}",
                other
            ))),
        }
    }

    /// Create a loan after re-validating against the authoritative store
    /// that no active loan exists for the book. The local cache may be
    /// stale by the time this runs; this check, not the cache, is the
    /// real defense against double-borrowing.
    pub async fn create(
        &self,
        book: &Book,
        user: &SessionUser,
        duration: Duration,
    ) -> AppResult<LoanRecord> {
        let filter = Filter::new().field_eq("bookId", book.id.as_str());
        let existing = self.backend.query_once(LOANS_COLLECTION, &filter).await?;
        let active = existing
            .into_iter()
            .filter_map(|snapshot| Self::to_record(snapshot).ok())
            .find(|loan| loan.is_active());
        if let Some(loan) = active {
            if loan.borrowed_by == user.id {
                return Err(AppError::AlreadyBorrowedByUser(book.title.clone()));
            }
            return Err(AppError::AlreadyBorrowed(book.title.clone()));
        }

        let borrowed_at = Utc::now();
        let mut record = LoanRecord {
            id: String::new(),
            book_id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            cover: book.cover.clone(),
            borrowed_by: user.id.clone(),
            borrowed_by_username: user.display_name.clone(),
            borrowed_by_email: user.email.clone(),
            borrowed_at,
            due_date: Some(borrowed_at + duration),
            returned_at: None,
        };
        record.id = self
            .backend
            .create(LOANS_COLLECTION, Self::to_document(&record)?)
            .await?;
        Ok(record)
    }

    /// Close a loan, setting `returnedAt` exactly once and touching no
    /// other field.
    pub async fn mark_returned(&self, loan_id: &str) -> AppResult<LoanRecord> {
        let fields = self
            .backend
            .get(LOANS_COLLECTION, loan_id)
            .await?
            .ok_or_else(|| AppError::LoanNotFound(loan_id.to_string()))?;
        let mut record = Self::to_record(DocumentSnapshot {
            id: loan_id.to_string(),
            fields,
        })?;
        if record.returned_at.is_some() {
            return Err(AppError::AlreadyReturned(loan_id.to_string()));
        }

        let returned_at = Utc::now();
        let mut update = Document::new();
        update.insert("returnedAt".to_string(), serde_json::to_value(returned_at)?);
        self.backend
            .update(LOANS_COLLECTION, loan_id, update)
            .await?;

        record.returned_at = Some(returned_at);
        Ok(record)
    }

    /// Live feed of all active loans
    pub fn subscribe_active_loans(
        &self,
        sink: impl Fn(Vec<LoanRecord>) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.subscribe_records(Filter::new().field_null("returnedAt"), sink, false)
    }

    /// Live feed of every loan of a user, newest first; returned loans
    /// are included so the store can serve loan history.
    pub fn subscribe_user_loans(
        &self,
        user_id: &str,
        sink: impl Fn(Vec<LoanRecord>) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.subscribe_records(Filter::new().field_eq("borrowedBy", user_id), sink, true)
    }

    fn subscribe_records(
        &self,
        filter: Filter,
        sink: impl Fn(Vec<LoanRecord>) + Send + Sync + 'static,
        newest_first: bool,
    ) -> Unsubscribe {
        let adapter: SnapshotSink = Arc::new(move |snapshots: Vec<DocumentSnapshot>| {
            let mut records: Vec<LoanRecord> = snapshots
                .into_iter()
                .filter_map(|snapshot| match Self::to_record(snapshot) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping malformed loan document");
                        None
                    }
                })
                .collect();
            if newest_first {
                records.sort_by(|a, b| b.borrowed_at.cmp(&a.borrowed_at));
            }
            sink(records);
        });
        self.backend.subscribe(LOANS_COLLECTION, filter, adapter)
    }
}
