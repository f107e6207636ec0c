use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::{ChallengeRequest, ChallengeResponse},
    services::signer::ChainFamily,
    utils::ValidatedJson,
    AppState,
};

/// Issue a single-use sign-in challenge for a wallet address
#[utoipa::path(
    post,
    path = "/auth/{chain}/challenge",
    params(
        ("chain" = String, Path, description = "Chain family: evm, solana or cosmos")
    ),
    request_body = ChallengeRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Unknown chain family or malformed address", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Wallet Authentication"
)]
pub async fn issue_challenge(
    State(state): State<AppState>,
    Path(chain): Path<String>,
    ValidatedJson(req): ValidatedJson<ChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let chain: ChainFamily = chain
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let challenge = state.challenges.issue(chain, &req.address).await?;

    Ok((
        StatusCode::OK,
        Json(ChallengeResponse {
            message: challenge.message,
            expires_in: challenge.expires_in,
        }),
    ))
}
