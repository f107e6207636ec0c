pub mod auth_identity;
pub mod organization;
pub mod permission;
pub mod user;
pub mod workspace;

pub use auth_identity::{AuthIdentity, AuthProvider};
pub use organization::{Organization, OrganizationMember, OrganizationResponse, OrgRole, SubscriptionTier};
pub use permission::effective_permissions;
pub use user::{User, UserResponse};
pub use workspace::{Workspace, WorkspaceMember, WorkspaceResponse, WorkspaceRole};
