use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,

    #[schema(example = "Alice Park")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChallengeRequest {
    #[validate(length(min = 1, message = "Address is required"))]
    #[schema(example = "0xabcdef0123456789abcdef0123456789abcdef01")]
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeResponse {
    /// Message to sign with the wallet, nonce embedded.
    pub message: String,
    /// Seconds until the challenge expires.
    #[schema(example = 300)]
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WalletVerifyRequest {
    #[validate(length(min = 1, message = "Address is required"))]
    #[schema(example = "0xabcdef0123456789abcdef0123456789abcdef01")]
    pub address: String,

    /// The full challenge message that was signed.
    #[validate(length(min = 1, message = "Signed message is required"))]
    pub signed_message: String,

    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,

    /// Base64 compressed public key; required for chain families
    /// whose signatures do not permit key recovery.
    pub public_key: Option<String>,

    #[schema(example = "Alice Park")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WalletLinkRequest {
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "Signed message is required"))]
    pub signed_message: String,

    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,

    pub public_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletLinkResponse {
    #[schema(example = "linked")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionTokenResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until the session token expires.
    #[schema(example = 3600)]
    pub expires_in: i64,
}

impl SessionTokenResponse {
    pub fn new(token: String, expires_in: i64) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SwitchContextRequest {
    pub organization_id: Uuid,
    /// Target workspace; defaults to the organization's default
    /// workspace when omitted.
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionContextResponse {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub workspace_id: Uuid,
    pub permissions: Vec<String>,
}
