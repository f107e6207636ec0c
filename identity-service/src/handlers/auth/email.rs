use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginRequest, SignupRequest},
    utils::ValidatedJson,
    AppState,
};

/// Sign up with email and password
#[utoipa::path(
    post,
    path = "/auth/email/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, session issued", body = SessionTokenResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Email Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .identity
        .signup_email(&req.email, req.password, req.display_name)
        .await?;

    let (org, workspace) = state.tenancy.ensure_tenant(&user).await?;
    let session = state
        .context
        .issue(user.user_id, org.org_id, workspace.workspace_id)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/email/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionTokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Email Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.identity.login_email(&req.email, req.password).await?;

    // ensure_tenant doubles as the recovery path: a user who deleted
    // every organization gets a fresh one here.
    let (org, workspace) = state.tenancy.ensure_tenant(&user).await?;
    let session = state
        .context
        .issue(user.user_id, org.org_id, workspace.workspace_id)
        .await?;

    Ok((StatusCode::OK, Json(session)))
}
