//! User model - the identity anchor every authentication method resolves to.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User entity. Created on first successful authentication of any
/// kind; never deleted by this service (soft-deactivation only).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new active user.
    pub fn new(display_name: Option<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            display_name,
            is_active: true,
            created_utc: Utc::now(),
        }
    }

    /// Name used when deriving labels for provisioned tenants.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Personal")
    }
}

/// User response for API (no credential material).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            display_name: u.display_name,
            is_active: u.is_active,
            created_utc: u.created_utc,
        }
    }
}
