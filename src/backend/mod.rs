//! Backing-store and identity-provider seams
//!
//! The hosted document database and the identity provider are external
//! collaborators; the client core consumes them only through the traits
//! defined here. The `memory` and `identity` modules carry the
//! in-process implementations used by tests and the demo binary.

pub mod identity;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::AppResult;

/// Raw document body as stored in a collection
pub type Document = Map<String, Value>;

/// A document together with its backing-store id
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub fields: Document,
}

/// Sink receiving the full matching record set on every change.
/// Deliveries are total, not diffs: each one replaces prior state for
/// the subscribed scope.
pub type SnapshotSink = Arc<dyn Fn(Vec<DocumentSnapshot>) + Send + Sync>;

/// Detaches a live feed; invoked at most once
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq(String, Value),
    IsNull(String),
}

/// Conjunction of field predicates over a collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.to_string(), value.into()));
        self
    }

    /// Matches both an explicit null and an absent field
    pub fn field_null(mut self, field: &str) -> Self {
        self.clauses.push(Clause::IsNull(field.to_string()));
        self
    }

    pub fn matches(&self, fields: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, value) => fields.get(field) == Some(value),
            Clause::IsNull(field) => matches!(fields.get(field), None | Some(Value::Null)),
        })
    }
}

/// Primitives the client core consumes from the hosted document database.
///
/// The store behind this trait is the source of truth: local caches may
/// lag it, and every conditional check that matters for correctness must
/// ultimately run against it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Create a document, returning its assigned id
    async fn create(&self, collection: &str, fields: Document) -> AppResult<String>;

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// Partial field update; fields absent from `fields` are untouched
    async fn update(&self, collection: &str, id: &str, fields: Document) -> AppResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()>;

    /// One-shot filtered read
    async fn query_once(&self, collection: &str, filter: &Filter) -> AppResult<Vec<DocumentSnapshot>>;

    /// Push-based live query. The sink receives the current matching set
    /// immediately, then the full matching set again after every change.
    /// Feed errors are logged by the implementation and never surface
    /// here; the last delivered snapshot stays valid for consumers.
    fn subscribe(&self, collection: &str, filter: Filter, sink: SnapshotSink) -> Unsubscribe;
}
