//! Tenant access verification middleware.
//!
//! Every protected route passes through here: the bearer credential
//! is decoded and its signature/expiry checked, then the embedded
//! membership is re-confirmed against the database. A membership
//! revoked after token issuance is rejected immediately rather than
//! honored until expiry.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::SessionClaims;
use crate::AppState;

/// Verified tenant context for the current request, derived from the
/// credential and re-checked against live membership.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub workspace_id: Uuid,
    pub permissions: Vec<String>,
}

impl SessionContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl From<&SessionClaims> for SessionContext {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            org_id: claims.org_id,
            workspace_id: claims.ws_id,
            permissions: claims.perms.clone(),
        }
    }
}

/// Middleware to require a valid session credential and live
/// membership.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::AuthError(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.jwt.validate_session_token(token)?;

    // Signature and expiry alone are not enough: the membership the
    // token was issued against must still exist.
    state.context.verify_access(&claims).await?;

    let context = SessionContext::from(&claims);
    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Extractor for the decoded session claims.
pub struct AuthUser(pub SessionClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<SessionClaims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Session claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser(claims.clone()))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Session context not found")))
    }
}
