use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::org::{CreateOrganizationRequest, CreateOrganizationResponse, CreateWorkspaceRequest},
    middleware::AuthUser,
    models::{OrganizationResponse, WorkspaceResponse},
    utils::ValidatedJson,
    AppState,
};

/// Create a new organization owned by the caller
#[utoipa::path(
    post,
    path = "/orgs",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created with its default workspace", body = CreateOrganizationResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Tenancy",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_org(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = state.identity.find_user(user.0.sub).await?;
    let (org, workspace) = state.tenancy.create_organization(&caller, req.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrganizationResponse {
            organization: OrganizationResponse::from(org),
            workspace: WorkspaceResponse::from(workspace),
        }),
    ))
}

/// Delete an organization (owner only)
#[utoipa::path(
    delete,
    path = "/orgs/{org_id}",
    params(
        ("org_id" = Uuid, Path, description = "Organization to delete")
    ),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Tenancy",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_org(
    State(state): State<AppState>,
    user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.tenancy.delete_organization(user.0.sub, org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a workspace inside an organization
#[utoipa::path(
    post,
    path = "/orgs/{org_id}/workspaces",
    params(
        ("org_id" = Uuid, Path, description = "Parent organization")
    ),
    request_body = CreateWorkspaceRequest,
    responses(
        (status = 201, description = "Workspace created", body = WorkspaceResponse),
        (status = 403, description = "Caller cannot manage workspaces here", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Tenancy",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    user: AuthUser,
    Path(org_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateWorkspaceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let workspace = state
        .tenancy
        .create_workspace(user.0.sub, org_id, req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(WorkspaceResponse::from(workspace))))
}
