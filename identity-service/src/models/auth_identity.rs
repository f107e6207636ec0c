//! Auth identity model - one authentication method bound to a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Identity provider codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Evm,
    Solana,
    Cosmos,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Password => "password",
            AuthProvider::Evm => "evm",
            AuthProvider::Solana => "solana",
            AuthProvider::Cosmos => "cosmos",
        }
    }

    pub fn is_wallet(&self) -> bool {
        !matches!(self, AuthProvider::Password)
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "password" => Ok(AuthProvider::Password),
            "evm" => Ok(AuthProvider::Evm),
            "solana" => Ok(AuthProvider::Solana),
            "cosmos" => Ok(AuthProvider::Cosmos),
            _ => Err(format!("Invalid identity provider: {}", s)),
        }
    }
}

/// One authentication method bound to exactly one user.
///
/// `(provider_code, identifier)` is globally unique: an email address
/// or wallet address belongs to at most one user at any time. For
/// password identities `credential_hash` holds the Argon2 hash;
/// wallet identities carry no stored secret.
#[derive(Debug, Clone, FromRow)]
pub struct AuthIdentity {
    pub ident_id: Uuid,
    pub user_id: Uuid,
    pub provider_code: String,
    pub identifier: String,
    pub credential_hash: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl AuthIdentity {
    /// Create a new password identity keyed by normalized email.
    pub fn new_password(user_id: Uuid, email: String, password_hash: String) -> Self {
        Self {
            ident_id: Uuid::new_v4(),
            user_id,
            provider_code: AuthProvider::Password.as_str().to_string(),
            identifier: email,
            credential_hash: Some(password_hash),
            created_utc: Utc::now(),
        }
    }

    /// Create a new wallet identity keyed by normalized address.
    pub fn new_wallet(user_id: Uuid, provider: AuthProvider, address: String) -> Self {
        Self {
            ident_id: Uuid::new_v4(),
            user_id,
            provider_code: provider.as_str().to_string(),
            identifier: address,
            credential_hash: None,
            created_utc: Utc::now(),
        }
    }

    pub fn is_password(&self) -> bool {
        self.provider_code == AuthProvider::Password.as_str()
    }
}
