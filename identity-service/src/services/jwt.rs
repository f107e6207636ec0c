use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// JWT service for session token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_token_expiry_minutes: i64,
}

/// Claims carried by a session token.
///
/// The token is a self-contained, immutable value: switching
/// organization or workspace always issues a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Active organization
    pub org_id: Uuid,
    /// Active workspace
    pub ws_id: Uuid,
    /// Effective "resource:action" permissions at issuance time
    pub perms: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            session_token_expiry_minutes: config.session_token_expiry_minutes,
        }
    }

    /// Encode a session token for the given context.
    pub fn generate_session_token(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        workspace_id: Uuid,
        perms: Vec<String>,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.session_token_expiry_minutes);

        let claims = SessionClaims {
            sub: user_id,
            org_id,
            ws_id: workspace_id,
            perms,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Validate signature and expiry, returning the decoded claims.
    pub fn validate_session_token(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                    _ => ServiceError::TokenInvalid,
                }
            })?;

        Ok(token_data.claims)
    }

    /// Session token expiry in seconds (for client info)
    pub fn session_token_expiry_seconds(&self) -> i64 {
        self.session_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "a-test-secret-at-least-32-bytes-long!!".to_string(),
            session_token_expiry_minutes: 60,
        })
    }

    fn test_perms() -> Vec<String> {
        vec!["assistant:read".to_string(), "assistant:write".to_string()]
    }

    #[test]
    fn session_token_round_trip() {
        let service = test_service();
        let (user, org, ws) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let token = service
            .generate_session_token(user, org, ws, test_perms())
            .unwrap();
        let claims = service.validate_session_token(&token).unwrap();

        assert_eq!(claims.sub, user);
        assert_eq!(claims.org_id, org);
        assert_eq!(claims.ws_id, ws);
        assert_eq!(claims.perms, test_perms());
        assert!(claims.exp > claims.iat);
        assert_eq!(service.session_token_expiry_seconds(), 3600);
    }

    #[test]
    fn expired_token_is_distinguished() {
        let service = test_service();
        let now = Utc::now();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            ws_id: Uuid::new_v4(),
            perms: test_perms(),
            exp: (now - Duration::hours(2)).timestamp(),
            iat: (now - Duration::hours(3)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("a-test-secret-at-least-32-bytes-long!!".as_bytes()),
        )
        .unwrap();

        let err = service.validate_session_token(&token).unwrap_err();
        assert!(matches!(err, ServiceError::TokenExpired));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let service = test_service();
        let token = service
            .generate_session_token(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), test_perms())
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        let err = service.validate_session_token(&tampered).unwrap_err();
        assert!(matches!(err, ServiceError::TokenInvalid));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let service = test_service();
        let other = JwtService::new(&JwtConfig {
            secret: "another-secret-also-32-bytes-long!!!!!".to_string(),
            session_token_expiry_minutes: 60,
        });

        let token = other
            .generate_session_token(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), test_perms())
            .unwrap();
        let err = service.validate_session_token(&token).unwrap_err();
        assert!(matches!(err, ServiceError::TokenInvalid));
    }
}
