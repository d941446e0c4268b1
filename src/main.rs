//! Neon Archive - shared digital library coordination
//!
//! Demo binary: runs a session against the in-memory backend and walks
//! through sign-up, borrow, return and wishlist handling.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neon_archive::{
    backend::{identity::MemoryIdentity, memory::MemoryBackend},
    config::AppConfig,
    models::book::Book,
    Session,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("neon_archive={}", config.logging.level).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let backend = Arc::new(MemoryBackend::new());
    let identity = Arc::new(MemoryIdentity::new());
    let session = Session::new(backend, identity, config);
    let services = &session.services;

    let user = services
        .session
        .sign_up("case@neon.example", "chiba-city", Some("Case"))
        .await?;
    tracing::info!(user_id = %user.id, "session opened");

    // Hold the live feeds for the duration of the run.
    let _active = services.loans.watch_active_loans();
    let _mine = services.loans.watch_user_loans(&user.id);
    let _wishlist = services.wishlist.watch_user_wishlist(&user.id);

    let book = Book {
        id: "OL27258W".to_string(),
        title: "Neuromancer".to_string(),
        author: "William Gibson".to_string(),
        cover: None,
        year: Some(1984),
    };

    let loan = services.borrow_book(&book).await?;
    tracing::info!(due = ?loan.due_date, "borrowed {}", book.title);

    match services.borrow_book(&book).await {
        Err(err) => tracing::info!("second borrow rejected: {err}"),
        Ok(_) => unreachable!("duplicate borrow must be rejected"),
    }

    services.return_book(&loan.id).await?;
    tracing::info!("returned {}", book.title);

    services.add_to_wishlist(&book).await?;
    tracing::info!(items = services.wishlist.items().len(), "wishlist updated");

    services.session.sign_out().await?;
    // Give the reset watcher and notification worker a beat to drain.
    tokio::time::sleep(Duration::from_millis(50)).await;
    tracing::info!(
        feeds = services.subscriptions.active_feeds(),
        "session closed"
    );

    Ok(())
}
