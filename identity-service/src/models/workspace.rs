//! Workspace model - the scoping unit inside an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Workspace-level roles, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Admin,
    Editor,
    Viewer,
}

impl WorkspaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceRole::Admin => "admin",
            WorkspaceRole::Editor => "editor",
            WorkspaceRole::Viewer => "viewer",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            WorkspaceRole::Admin => 3,
            WorkspaceRole::Editor => 2,
            WorkspaceRole::Viewer => 1,
        }
    }
}

impl std::str::FromStr for WorkspaceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(WorkspaceRole::Admin),
            "editor" => Ok(WorkspaceRole::Editor),
            "viewer" => Ok(WorkspaceRole::Viewer),
            _ => Err(format!("Invalid workspace role: {}", s)),
        }
    }
}

/// Workspace entity. Every workspace belongs to exactly one
/// organization; a provisioned organization has exactly one default
/// workspace.
#[derive(Debug, Clone, FromRow)]
pub struct Workspace {
    pub workspace_id: Uuid,
    pub org_id: Uuid,
    pub workspace_name: String,
    pub is_default: bool,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Workspace {
    pub fn new(org_id: Uuid, workspace_name: String, created_by: Uuid) -> Self {
        Self {
            workspace_id: Uuid::new_v4(),
            org_id,
            workspace_name,
            is_default: false,
            created_by,
            created_utc: Utc::now(),
        }
    }

    /// The default workspace created alongside its organization.
    pub fn new_default(org_id: Uuid, created_by: Uuid) -> Self {
        let mut ws = Self::new(org_id, "Default Workspace".to_string(), created_by);
        ws.is_default = true;
        ws
    }
}

/// Workspace membership row.
#[derive(Debug, Clone, FromRow)]
pub struct WorkspaceMember {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role_code: String,
    pub created_utc: DateTime<Utc>,
}

impl WorkspaceMember {
    pub fn new(workspace_id: Uuid, user_id: Uuid, role: WorkspaceRole) -> Self {
        Self {
            workspace_id,
            user_id,
            role_code: role.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }
}

/// Workspace response for API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkspaceResponse {
    pub workspace_id: Uuid,
    pub org_id: Uuid,
    pub workspace_name: String,
    pub is_default: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(w: Workspace) -> Self {
        Self {
            workspace_id: w.workspace_id,
            org_id: w.org_id,
            workspace_name: w.workspace_name,
            is_default: w.is_default,
            created_utc: w.created_utc,
        }
    }
}
