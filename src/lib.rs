//! neon-archive
//!
//! Loan, wishlist and catalog coordination for a shared digital
//! library. The crate keeps a live local cache of loan and wishlist
//! state fed by backend subscriptions, reference-counts those
//! subscriptions so concurrent consumers share one feed per key, and
//! exposes session-aware borrow/return/wishlist operations with
//! fail-fast precondition checks backed by authoritative re-validation
//! at write time.

pub mod backend;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;
pub mod subscriptions;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use std::sync::Arc;

use backend::{identity::IdentityProvider, DocumentBackend};
use services::Services;

/// One client session over a shared backend.
///
/// Every session carries its own stores and subscription registry;
/// sessions sharing a backend converge through the backend's live
/// feeds, not through each other.
#[derive(Clone)]
pub struct Session {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
}

impl Session {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        identity: Arc<dyn IdentityProvider>,
        config: AppConfig,
    ) -> Self {
        let services = Arc::new(Services::new(backend, identity, &config));
        Self {
            config: Arc::new(config),
            services,
        }
    }
}
