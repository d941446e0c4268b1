//! Catalog metadata client (Open Library)

use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tokio::task::AbortHandle;

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::book::{Book, WorkDetails},
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: String,
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    cover_i: Option<i64>,
    #[serde(default)]
    cover_edition_key: Option<String>,
    #[serde(default)]
    first_publish_year: Option<i32>,
}

/// Work descriptions arrive either as a bare string or a typed object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkDescription {
    Text(String),
    Typed { value: String },
}

impl WorkDescription {
    fn into_text(self) -> String {
        match self {
            WorkDescription::Text(text) => text,
            WorkDescription::Typed { value } => value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkResponse {
    title: String,
    #[serde(default)]
    description: Option<WorkDescription>,
    #[serde(default)]
    subjects: Vec<String>,
}

fn to_book(doc: SearchDoc, covers_endpoint: &str) -> Book {
    let id = doc
        .key
        .strip_prefix("/works/")
        .unwrap_or(&doc.key)
        .to_string();
    let cover = if let Some(cover_id) = doc.cover_i {
        Some(format!("{}/b/id/{}-L.jpg", covers_endpoint, cover_id))
    } else {
        doc.cover_edition_key
            .map(|olid| format!("{}/b/olid/{}-L.jpg", covers_endpoint, olid))
    };

    Book {
        id,
        title: doc.title,
        author: doc
            .author_name
            .into_iter()
            .next()
            .unwrap_or_else(|| "Unknown Author".to_string()),
        cover,
        year: doc.first_publish_year,
    }
}

#[derive(Clone)]
pub struct CatalogService {
    http: reqwest::Client,
    config: CatalogConfig,
    inflight: Arc<Mutex<Option<AbortHandle>>>,
}

impl CatalogService {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Search works by title.
    ///
    /// Starting a new search aborts the previous in-flight one, which
    /// then observes [`AppError::Cancelled`]; a stale response can never
    /// overwrite newer results.
    pub async fn search(&self, title: &str) -> AppResult<Vec<Book>> {
        if title.trim().is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .http
            .get(&self.config.search_endpoint)
            .query(&[("title", title)]);
        let covers_endpoint = self.config.covers_endpoint.clone();
        let limit = self.config.search_limit;

        let task = tokio::spawn(async move {
            let response = request.send().await?.error_for_status()?;
            let payload: SearchResponse = response.json().await?;
            Ok::<Vec<Book>, AppError>(
                payload
                    .docs
                    .into_iter()
                    .take(limit)
                    .map(|doc| to_book(doc, &covers_endpoint))
                    .collect(),
            )
        });

        let previous = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }

        match task.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_cancelled() => {
                tracing::debug!(title, "catalog search superseded by a newer one");
                Err(AppError::Cancelled)
            }
            Err(join_err) => Err(AppError::Internal(format!(
                "catalog search task failed: {}",
                join_err
            ))),
        }
    }

    /// Fetch the full detail of a work
    pub async fn get_work(&self, id: &str) -> AppResult<WorkDetails> {
        let url = format!("{}/works/{}.json", self.config.works_endpoint, id);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let payload: WorkResponse = response.json().await?;

        Ok(WorkDetails {
            title: payload.title,
            description: payload.description.map(WorkDescription::into_text),
            subjects: payload.subjects,
        })
    }
}
