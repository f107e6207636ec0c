use service_core::error::AppError;
use thiserror::Error;

use crate::services::signer::SignerError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    AlreadyRegistered,

    #[error("User account is deactivated")]
    UserDeactivated,

    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    #[error("Malformed credential material: {0}")]
    MalformedCredential(String),

    #[error("Challenge not found")]
    ChallengeNotFound,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Challenge mismatch")]
    ChallengeMismatch,

    #[error("Identity already linked to this account")]
    AlreadyLinkedToSelf,

    #[error("Identity already linked to another account")]
    AlreadyLinkedToOther,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("No longer a member of the organization or workspace")]
    NoLongerMember,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Workspace not found")]
    WorkspaceNotFound,

    #[error("Operation not permitted")]
    Forbidden,
}

impl From<SignerError> for ServiceError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::InvalidAddress(msg) => ServiceError::InvalidWalletAddress(msg),
            SignerError::InvalidSignature(msg)
            | SignerError::InvalidPublicKey(msg) => ServiceError::MalformedCredential(msg),
            SignerError::MissingPublicKey => {
                ServiceError::MalformedCredential("public key is required".to_string())
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::AlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::UserDeactivated => {
                AppError::Forbidden(anyhow::anyhow!("User account is deactivated"))
            }
            ServiceError::InvalidWalletAddress(msg) => {
                AppError::BadRequest(anyhow::anyhow!("Invalid wallet address: {}", msg))
            }
            ServiceError::MalformedCredential(msg) => {
                AppError::BadRequest(anyhow::anyhow!("Malformed credential material: {}", msg))
            }
            ServiceError::ChallengeNotFound => {
                AppError::NotFound(anyhow::anyhow!("Challenge not found"))
            }
            ServiceError::ChallengeExpired => {
                AppError::AuthError(anyhow::anyhow!("Challenge expired"))
            }
            ServiceError::ChallengeMismatch => {
                AppError::AuthError(anyhow::anyhow!("Challenge mismatch"))
            }
            ServiceError::AlreadyLinkedToSelf => AppError::Conflict(anyhow::anyhow!(
                "Identity already linked to this account"
            )),
            ServiceError::AlreadyLinkedToOther => AppError::Conflict(anyhow::anyhow!(
                "Identity already linked to another account"
            )),
            ServiceError::TokenExpired => AppError::AuthError(anyhow::anyhow!("Token expired")),
            ServiceError::TokenInvalid => AppError::AuthError(anyhow::anyhow!("Invalid token")),
            ServiceError::NoLongerMember => AppError::Forbidden(anyhow::anyhow!(
                "No longer a member of the organization or workspace"
            )),
            ServiceError::OrganizationNotFound => {
                AppError::NotFound(anyhow::anyhow!("Organization not found"))
            }
            ServiceError::WorkspaceNotFound => {
                AppError::NotFound(anyhow::anyhow!("Workspace not found"))
            }
            ServiceError::Forbidden => {
                AppError::Forbidden(anyhow::anyhow!("Operation not permitted"))
            }
        }
    }
}
