//! Identity provider seam and in-memory implementation

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::SessionUser;

/// Session lifecycle primitives consumed from the hosted identity
/// provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionUser>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AppResult<SessionUser>;

    async fn sign_out(&self) -> AppResult<()>;

    /// Watch the current session; `None` means signed out
    fn session_watch(&self) -> watch::Receiver<Option<SessionUser>>;
}

struct Account {
    password: String,
    user: SessionUser,
}

/// In-memory identity provider for tests and local runs
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<SessionUser>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            session: watch::channel(None).0,
        }
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionUser> {
        let accounts = self.accounts();
        let account = accounts
            .get(email)
            .filter(|account| account.password == password)
            .ok_or_else(|| AppError::Authentication("invalid credentials".to_string()))?;
        let user = account.user.clone();
        drop(accounts);

        self.session.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AppResult<SessionUser> {
        let mut accounts = self.accounts();
        if accounts.contains_key(email) {
            return Err(AppError::Authentication(format!(
                "account {} already exists",
                email
            )));
        }

        let display_name = display_name
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());
        let user = SessionUser {
            id: Uuid::new_v4().to_string(),
            display_name,
            email: email.to_string(),
            avatar_url: None,
        };
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        drop(accounts);

        self.session.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.session.send_replace(None);
        Ok(())
    }

    fn session_watch(&self) -> watch::Receiver<Option<SessionUser>> {
        self.session.subscribe()
    }
}
