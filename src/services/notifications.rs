//! Wishlist availability notifications
//!
//! Returning a book enqueues a notice onto a queued worker, keeping the
//! return operation decoupled from delivery. Delivery is fire-and-forget:
//! failures are logged and never surface to the returning user.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::NotificationsConfig;

/// Payload POSTed to the notification endpoint after a return
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAvailableNotice {
    pub book_id: String,
    pub book_title: String,
    pub book_author: String,
    /// The returning user, who should not be notified about their own
    /// return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_user_id: Option<String>,
}

#[derive(Clone)]
pub struct NotificationsService {
    tx: mpsc::UnboundedSender<BookAvailableNotice>,
}

impl NotificationsService {
    /// Spawn the delivery worker. With no endpoint configured the worker
    /// drains notices without sending anything. Must be called from
    /// within a Tokio runtime.
    pub fn new(config: NotificationsConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(deliver(config, rx));
        Self { tx }
    }

    /// Enqueue a notice; never blocks and never fails the caller
    pub fn notify_book_available(&self, notice: BookAvailableNotice) {
        if self.tx.send(notice).is_err() {
            tracing::warn!("notification worker is gone; dropping notice");
        }
    }
}

async fn deliver(
    config: NotificationsConfig,
    mut rx: mpsc::UnboundedReceiver<BookAvailableNotice>,
) {
    let http = reqwest::Client::new();

    while let Some(notice) = rx.recv().await {
        let Some(endpoint) = config.endpoint.as_deref() else {
            tracing::debug!(book_id = %notice.book_id, "no notification endpoint configured, skipping");
            continue;
        };

        match http.post(endpoint).json(&notice).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    status = %response.status(),
                    book_id = %notice.book_id,
                    "wishlist notification rejected"
                );
            }
            Ok(_) => {
                tracing::debug!(book_id = %notice.book_id, "wishlist notification sent");
            }
            Err(err) => {
                tracing::warn!(error = %err, book_id = %notice.book_id, "wishlist notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notice_wire_format() {
        let notice = BookAvailableNotice {
            book_id: "b1".into(),
            book_title: "Neuromancer".into(),
            book_author: "William Gibson".into(),
            exclude_user_id: Some("u1".into()),
        };
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(
            value,
            json!({
                "bookId": "b1",
                "bookTitle": "Neuromancer",
                "bookAuthor": "William Gibson",
                "excludeUserId": "u1",
            })
        );
    }

    #[tokio::test]
    async fn test_enqueue_without_endpoint_is_harmless() {
        let service = NotificationsService::new(NotificationsConfig { endpoint: None });
        service.notify_book_available(BookAvailableNotice {
            book_id: "b1".into(),
            book_title: "Neuromancer".into(),
            book_author: "William Gibson".into(),
            exclude_user_id: None,
        });
        // give the worker a turn; it must simply drain the queue
        tokio::task::yield_now().await;
    }
}
