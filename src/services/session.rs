//! Session management over the identity-provider seam

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    backend::identity::IdentityProvider,
    error::AppResult,
    models::user::SessionUser,
    store::{LoanStore, WishlistStore},
    subscriptions::SubscriptionRegistry,
};

#[derive(Clone)]
pub struct SessionService {
    identity: Arc<dyn IdentityProvider>,
}

impl SessionService {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionUser> {
        let user = self.identity.sign_in(email, password).await?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AppResult<SessionUser> {
        let user = self.identity.sign_up(email, password, display_name).await?;
        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    pub async fn sign_out(&self) -> AppResult<()> {
        self.identity.sign_out().await
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.identity.session_watch().borrow().clone()
    }

    /// Watch the session state; `None` means signed out
    pub fn session_watch(&self) -> watch::Receiver<Option<SessionUser>> {
        self.identity.session_watch()
    }

    /// Spawn the watcher enforcing the session teardown contract: on
    /// sign-out both stores are cleared and every live feed is
    /// force-released, so neither feeds nor the previous user's data
    /// leak into the next session.
    pub fn spawn_reset_watcher(
        &self,
        loan_store: Arc<LoanStore>,
        wishlist_store: Arc<WishlistStore>,
        registry: Arc<SubscriptionRegistry>,
    ) {
        let mut session = self.identity.session_watch();
        tokio::spawn(async move {
            while session.changed().await.is_ok() {
                let signed_out = session.borrow_and_update().is_none();
                if signed_out {
                    tracing::info!("session ended, clearing caches and detaching feeds");
                    registry.release_all();
                    loan_store.reset();
                    wishlist_store.reset();
                }
            }
        });
    }
}
