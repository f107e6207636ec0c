//! Context token issuance and access verification.
//!
//! A session token freezes (user, organization, workspace,
//! permissions) at issuance. Tokens are never mutated: switching
//! context re-verifies membership and issues a new one, and every
//! protected call re-confirms membership against the database rather
//! than trusting the embedded claims until expiry.

use uuid::Uuid;

use crate::dtos::auth::SessionTokenResponse;
use crate::models::effective_permissions;
use crate::services::jwt::{JwtService, SessionClaims};
use crate::services::tenancy::TenancyService;
use crate::services::ServiceError;

#[derive(Clone)]
pub struct ContextService {
    tenancy: TenancyService,
    jwt: JwtService,
}

impl ContextService {
    pub fn new(tenancy: TenancyService, jwt: JwtService) -> Self {
        Self { tenancy, jwt }
    }

    /// Issue a session token for a context the user is a live member
    /// of. Permissions are computed from the membership roles at this
    /// moment and embedded in the credential.
    pub async fn issue(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<SessionTokenResponse, ServiceError> {
        let (org_role, ws_role) = self
            .tenancy
            .verify_membership(user_id, org_id, workspace_id)
            .await?;

        let perms = effective_permissions(org_role, ws_role);
        let token = self
            .jwt
            .generate_session_token(user_id, org_id, workspace_id, perms)
            .map_err(ServiceError::Internal)?;

        Ok(SessionTokenResponse::new(
            token,
            self.jwt.session_token_expiry_seconds(),
        ))
    }

    /// Issue a fresh token scoped to another organization/workspace.
    /// The current credential is left untouched; the caller simply
    /// starts using the new one.
    pub async fn switch_context(
        &self,
        claims: &SessionClaims,
        org_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> Result<SessionTokenResponse, ServiceError> {
        let org = self
            .tenancy
            .find_organization(org_id)
            .await?
            .ok_or(ServiceError::OrganizationNotFound)?;

        let workspace_id = match workspace_id {
            Some(id) => id,
            None => {
                self.tenancy
                    .default_workspace_of(&org, claims.sub)
                    .await?
                    .workspace_id
            }
        };

        self.issue(claims.sub, org.org_id, workspace_id).await
    }

    /// Re-confirm that the claims still describe a live membership.
    /// A membership revoked after issuance fails here even though the
    /// token's signature and expiry are valid.
    pub async fn verify_access(&self, claims: &SessionClaims) -> Result<(), ServiceError> {
        self.tenancy
            .verify_membership(claims.sub, claims.org_id, claims.ws_id)
            .await
            .map(|_| ())
    }
}
