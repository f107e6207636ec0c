use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::{WalletLinkRequest, WalletLinkResponse, WalletVerifyRequest},
    middleware::AuthUser,
    services::signer::ChainFamily,
    utils::ValidatedJson,
    AppState,
};

/// Verify a signed challenge and establish a session
#[utoipa::path(
    post,
    path = "/auth/{chain}/verify",
    params(
        ("chain" = String, Path, description = "Chain family: evm, solana or cosmos")
    ),
    request_body = WalletVerifyRequest,
    responses(
        (status = 200, description = "Wallet verified, session issued", body = SessionTokenResponse),
        (status = 401, description = "Signature or challenge rejected", body = ErrorResponse),
        (status = 404, description = "No live challenge for this address", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Wallet Authentication"
)]
pub async fn verify_wallet(
    State(state): State<AppState>,
    Path(chain): Path<String>,
    ValidatedJson(req): ValidatedJson<WalletVerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let chain: ChainFamily = chain
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let user = state
        .identity
        .resolve_wallet(
            chain,
            &req.address,
            &req.signed_message,
            &req.signature,
            req.public_key.as_deref(),
            req.display_name,
        )
        .await?;

    let (org, workspace) = state.tenancy.ensure_tenant(&user).await?;
    let session = state
        .context
        .issue(user.user_id, org.org_id, workspace.workspace_id)
        .await?;

    Ok((StatusCode::OK, Json(session)))
}

/// Link an additional wallet to the authenticated account
#[utoipa::path(
    post,
    path = "/auth/{chain}/link",
    params(
        ("chain" = String, Path, description = "Chain family: evm, solana or cosmos")
    ),
    request_body = WalletLinkRequest,
    responses(
        (status = 200, description = "Wallet linked", body = WalletLinkResponse),
        (status = 401, description = "Signature or challenge rejected", body = ErrorResponse),
        (status = 409, description = "Wallet already linked", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Wallet Authentication",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn link_wallet(
    State(state): State<AppState>,
    Path(chain): Path<String>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<WalletLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let chain: ChainFamily = chain
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    state
        .identity
        .link_wallet(
            user.0.sub,
            chain,
            &req.address,
            &req.signed_message,
            &req.signature,
            req.public_key.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(WalletLinkResponse {
            status: "linked".to_string(),
        }),
    ))
}
