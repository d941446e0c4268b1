//! In-memory document backend
//!
//! Mirrors the behaviour the client core relies on from the hosted
//! document database: collections of schemaless documents and push-based
//! filtered live queries delivering the full matching set on every
//! change. Used by tests and the demo binary.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::{Document, DocumentBackend, DocumentSnapshot, Filter, SnapshotSink, Unsubscribe};
use crate::error::{AppError, AppResult};

struct Watcher {
    id: u64,
    collection: String,
    filter: Filter,
    sink: SnapshotSink,
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, BTreeMap<String, Document>>,
    watchers: Vec<Watcher>,
    next_watcher_id: u64,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn matching(state: &MemoryState, collection: &str, filter: &Filter) -> Vec<DocumentSnapshot> {
        state
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, fields)| filter.matches(fields))
                    .map(|(id, fields)| DocumentSnapshot {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver fresh snapshots to every watcher of `collection`. Sinks
    /// run outside the state lock so they may freely hit the stores.
    fn notify(&self, collection: &str) {
        let deliveries: Vec<(SnapshotSink, Vec<DocumentSnapshot>)> = {
            let state = Self::lock(&self.state);
            state
                .watchers
                .iter()
                .filter(|watcher| watcher.collection == collection)
                .map(|watcher| {
                    (
                        Arc::clone(&watcher.sink),
                        Self::matching(&state, collection, &watcher.filter),
                    )
                })
                .collect()
        };

        for (sink, snapshots) in deliveries {
            sink(snapshots);
        }
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn create(&self, collection: &str, fields: Document) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        {
            let mut state = Self::lock(&self.state);
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields);
        }
        self.notify(collection);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let state = Self::lock(&self.state);
        Ok(state
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> AppResult<()> {
        {
            let mut state = Self::lock(&self.state);
            let document = state
                .collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| {
                    AppError::Backend(format!("document {}/{} not found", collection, id))
                })?;
            for (key, value) in fields {
                document.insert(key, value);
            }
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let removed = {
            let mut state = Self::lock(&self.state);
            state
                .collections
                .get_mut(collection)
                .and_then(|documents| documents.remove(id))
                .is_some()
        };
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query_once(&self, collection: &str, filter: &Filter) -> AppResult<Vec<DocumentSnapshot>> {
        let state = Self::lock(&self.state);
        Ok(Self::matching(&state, collection, filter))
    }

    fn subscribe(&self, collection: &str, filter: Filter, sink: SnapshotSink) -> Unsubscribe {
        let (watcher_id, initial) = {
            let mut state = Self::lock(&self.state);
            let watcher_id = state.next_watcher_id;
            state.next_watcher_id += 1;
            let initial = Self::matching(&state, collection, &filter);
            state.watchers.push(Watcher {
                id: watcher_id,
                collection: collection.to_string(),
                filter,
                sink: Arc::clone(&sink),
            });
            (watcher_id, initial)
        };

        sink(initial);

        let state = Arc::clone(&self.state);
        Box::new(move || {
            let mut state = Self::lock(&state);
            state.watchers.retain(|watcher| watcher.id != watcher_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn collecting_sink() -> (SnapshotSink, Arc<StdMutex<Vec<Vec<DocumentSnapshot>>>>) {
        let deliveries = Arc::new(StdMutex::new(Vec::new()));
        let sink_deliveries = Arc::clone(&deliveries);
        let sink: SnapshotSink = Arc::new(move |snapshots| {
            sink_deliveries.lock().unwrap().push(snapshots);
        });
        (sink, deliveries)
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_snapshot() {
        let backend = MemoryBackend::new();
        backend
            .create("loans", doc(json!({"bookId": "b1"})))
            .await
            .unwrap();

        let (sink, deliveries) = collecting_sink();
        let _unsubscribe = backend.subscribe("loans", Filter::new(), sink);

        let deliveries = deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].len(), 1);
    }

    #[tokio::test]
    async fn test_update_moves_document_out_of_filtered_feed() {
        let backend = MemoryBackend::new();
        let id = backend
            .create("loans", doc(json!({"bookId": "b1", "returnedAt": null})))
            .await
            .unwrap();

        let (sink, deliveries) = collecting_sink();
        let _unsubscribe = backend.subscribe("loans", Filter::new().field_null("returnedAt"), sink);

        backend
            .update("loans", &id, doc(json!({"returnedAt": "2025-01-12T00:00:00Z"})))
            .await
            .unwrap();

        let deliveries = deliveries.lock().unwrap();
        // initial snapshot with the active loan, then an empty total set
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].len(), 1);
        assert!(deliveries[1].is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_deliveries() {
        let backend = MemoryBackend::new();
        let (sink, deliveries) = collecting_sink();
        let unsubscribe = backend.subscribe("loans", Filter::new(), sink);
        unsubscribe();

        backend
            .create("loans", doc(json!({"bookId": "b1"})))
            .await
            .unwrap();

        assert_eq!(deliveries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let backend = MemoryBackend::new();
        let result = backend.update("loans", "nope", Document::new()).await;
        assert!(matches!(result, Err(AppError::Backend(_))));
    }
}
