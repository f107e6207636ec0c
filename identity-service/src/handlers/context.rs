use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{SessionContextResponse, SwitchContextRequest},
    middleware::{AuthUser, SessionContext},
    utils::ValidatedJson,
    AppState,
};

/// Switch the session to another organization/workspace
#[utoipa::path(
    post,
    path = "/auth/context/switch",
    request_body = SwitchContextRequest,
    responses(
        (status = 200, description = "New session issued for the target context", body = SessionTokenResponse),
        (status = 403, description = "Not a member of the target context", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Session",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn switch_context(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<SwitchContextRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .context
        .switch_context(&user.0, req.organization_id, req.workspace_id)
        .await?;

    Ok((StatusCode::OK, Json(session)))
}

/// Echo the verified session context
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current session context", body = SessionContextResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Membership revoked since issuance", body = ErrorResponse)
    ),
    tag = "Session",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(context: SessionContext) -> impl IntoResponse {
    Json(SessionContextResponse {
        user_id: context.user_id,
        org_id: context.org_id,
        workspace_id: context.workspace_id,
        permissions: context.permissions,
    })
}
