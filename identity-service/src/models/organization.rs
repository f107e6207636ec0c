//! Organization model - the top-level tenant boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::User;

/// Trial length granted to newly provisioned organizations.
pub const TRIAL_DAYS: i64 = 30;

/// Subscription tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "enterprise" => Ok(SubscriptionTier::Enterprise),
            _ => Err(format!("Invalid subscription tier: {}", s)),
        }
    }
}

/// Organization-level roles, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "owner",
            OrgRole::Admin => "admin",
            OrgRole::Member => "member",
        }
    }

    /// Higher rank outranks lower.
    pub fn rank(&self) -> u8 {
        match self {
            OrgRole::Owner => 3,
            OrgRole::Admin => 2,
            OrgRole::Member => 1,
        }
    }

    pub fn can_manage_workspaces(&self) -> bool {
        self.rank() >= OrgRole::Admin.rank()
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(OrgRole::Owner),
            "admin" => Ok(OrgRole::Admin),
            "member" => Ok(OrgRole::Member),
            _ => Err(format!("Invalid organization role: {}", s)),
        }
    }
}

/// Organization entity.
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub org_id: Uuid,
    pub org_name: String,
    pub tier_code: String,
    pub trial_ends_utc: DateTime<Utc>,
    pub created_by: Uuid,
    pub is_personal_default: bool,
    pub created_utc: DateTime<Utc>,
}

impl Organization {
    /// Create an explicitly named organization.
    pub fn new(org_name: String, created_by: Uuid) -> Self {
        Self {
            org_id: Uuid::new_v4(),
            org_name,
            tier_code: SubscriptionTier::Free.as_str().to_string(),
            trial_ends_utc: Utc::now() + Duration::days(TRIAL_DAYS),
            created_by,
            is_personal_default: false,
            created_utc: Utc::now(),
        }
    }

    /// Create the auto-provisioned personal organization for a user
    /// with none. At most one of these may exist per creator.
    pub fn new_personal(user: &User) -> Self {
        let mut org = Self::new(format!("{}'s Organization", user.label()), user.user_id);
        org.is_personal_default = true;
        org
    }

    pub fn tier(&self) -> SubscriptionTier {
        self.tier_code.parse().unwrap_or(SubscriptionTier::Free)
    }
}

/// Organization membership row.
#[derive(Debug, Clone, FromRow)]
pub struct OrganizationMember {
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role_code: String,
    pub created_utc: DateTime<Utc>,
}

impl OrganizationMember {
    pub fn new(org_id: Uuid, user_id: Uuid, role: OrgRole) -> Self {
        Self {
            org_id,
            user_id,
            role_code: role.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }
}

/// Organization response for API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrganizationResponse {
    pub org_id: Uuid,
    pub org_name: String,
    pub tier_code: String,
    pub trial_ends_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(o: Organization) -> Self {
        Self {
            org_id: o.org_id,
            org_name: o.org_name,
            tier_code: o.tier_code,
            trial_ends_utc: o.trial_ends_utc,
            created_utc: o.created_utc,
        }
    }
}
