//! Session user model

use serde::{Deserialize, Serialize};

/// Authenticated user as delivered by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}
