//! Identity resolution: maps verified credentials to users.
//!
//! Password and wallet flows both funnel into one rule: a verified
//! (provider, identifier) pair resolves to exactly one user, created
//! on first sight for wallets, explicitly for passwords. Linking
//! attaches further identities to an existing user and never steals
//! an identifier from another account.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AuthIdentity, AuthProvider, User};
use crate::services::challenge::ChallengeService;
use crate::services::signer::{normalize_address, verifier_for, ChainFamily};
use crate::services::ServiceError;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

#[derive(Clone)]
pub struct IdentityService {
    pool: PgPool,
    challenges: ChallengeService,
}

impl IdentityService {
    pub fn new(pool: PgPool, challenges: ChallengeService) -> Self {
        Self { pool, challenges }
    }

    /// Explicit password signup. Fails with `AlreadyRegistered` when
    /// the email is taken, including when a concurrent signup wins
    /// the insert race.
    pub async fn signup_email(
        &self,
        email: &str,
        password: String,
        display_name: Option<String>,
    ) -> Result<User, ServiceError> {
        let email = normalize_email(email);

        if self
            .find_identity(AuthProvider::Password, &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyRegistered);
        }

        let password_hash =
            hash_password(&Password::new(password)).map_err(ServiceError::Internal)?;

        let user = User::new(display_name);
        let identity =
            AuthIdentity::new_password(user.user_id, email, password_hash.into_string());

        self.insert_user_with_identity(&user, &identity)
            .await
            .map_err(|e| unique_violation_as(e, ServiceError::AlreadyRegistered))?;

        tracing::info!(user_id = %user.user_id, "User registered with password identity");

        Ok(user)
    }

    /// Password login. Unknown email and wrong password are
    /// deliberately indistinguishable to the caller.
    pub async fn login_email(&self, email: &str, password: String) -> Result<User, ServiceError> {
        let email = normalize_email(email);

        let identity = self
            .find_identity(AuthProvider::Password, &email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let stored_hash = identity
            .credential_hash
            .clone()
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(password),
            &PasswordHashString::new(stored_hash),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        let user = self.find_user(identity.user_id).await?;
        if !user.is_active {
            return Err(ServiceError::UserDeactivated);
        }

        Ok(user)
    }

    /// Wallet authentication: consume the live challenge, verify the
    /// signature, then resolve (or create) the user. No identity
    /// lookup happens before both checks pass.
    pub async fn resolve_wallet(
        &self,
        chain: ChainFamily,
        address: &str,
        signed_message: &str,
        signature: &str,
        public_key: Option<&str>,
        display_name: Option<String>,
    ) -> Result<User, ServiceError> {
        let address = self
            .verify_wallet_proof(chain, address, signed_message, signature, public_key)
            .await?;

        let provider = AuthProvider::from(chain);

        if let Some(identity) = self.find_identity(provider, &address).await? {
            let user = self.find_user(identity.user_id).await?;
            if !user.is_active {
                return Err(ServiceError::UserDeactivated);
            }
            return Ok(user);
        }

        // Signup-on-first-auth for wallets.
        let user = User::new(display_name);
        let identity = AuthIdentity::new_wallet(user.user_id, provider, address.clone());

        match self.insert_user_with_identity(&user, &identity).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %user.user_id,
                    chain = chain.as_str(),
                    "User created from wallet identity"
                );
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => {
                // A concurrent first-auth for the same address won;
                // resolve to the identity it created.
                let identity = self
                    .find_identity(provider, &address)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Internal(anyhow::anyhow!(
                            "identity insert conflicted but no identity found"
                        ))
                    })?;
                self.find_user(identity.user_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Attach a wallet identity to an already-authenticated user.
    pub async fn link_wallet(
        &self,
        user_id: Uuid,
        chain: ChainFamily,
        address: &str,
        signed_message: &str,
        signature: &str,
        public_key: Option<&str>,
    ) -> Result<AuthIdentity, ServiceError> {
        let address = self
            .verify_wallet_proof(chain, address, signed_message, signature, public_key)
            .await?;

        let provider = AuthProvider::from(chain);

        if let Some(existing) = self.find_identity(provider, &address).await? {
            return Err(if existing.user_id == user_id {
                ServiceError::AlreadyLinkedToSelf
            } else {
                ServiceError::AlreadyLinkedToOther
            });
        }

        let identity = AuthIdentity::new_wallet(user_id, provider, address.clone());

        match self.insert_identity(&identity).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %user_id,
                    chain = chain.as_str(),
                    "Wallet identity linked"
                );
                Ok(identity)
            }
            Err(e) if is_unique_violation(&e) => {
                // Lost a race against another link or first-auth.
                let winner = self
                    .find_identity(provider, &address)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Internal(anyhow::anyhow!(
                            "identity insert conflicted but no identity found"
                        ))
                    })?;
                Err(if winner.user_id == user_id {
                    ServiceError::AlreadyLinkedToSelf
                } else {
                    ServiceError::AlreadyLinkedToOther
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, display_name, is_active, created_utc
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::InvalidCredentials)
    }

    /// Consume the challenge, then verify the signature. Returns the
    /// normalized address on success.
    async fn verify_wallet_proof(
        &self,
        chain: ChainFamily,
        address: &str,
        signed_message: &str,
        signature: &str,
        public_key: Option<&str>,
    ) -> Result<String, ServiceError> {
        let address = normalize_address(chain, address)?;

        self.challenges
            .consume(chain, &address, signed_message)
            .await?;

        let verified =
            verifier_for(chain).verify(&address, signed_message, signature, public_key)?;
        if !verified {
            tracing::warn!(
                chain = chain.as_str(),
                address = %address,
                "Wallet signature verification failed"
            );
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(address)
    }

    async fn find_identity(
        &self,
        provider: AuthProvider,
        identifier: &str,
    ) -> Result<Option<AuthIdentity>, ServiceError> {
        let identity = sqlx::query_as::<_, AuthIdentity>(
            r#"
            SELECT ident_id, user_id, provider_code, identifier, credential_hash, created_utc
            FROM auth_identities
            WHERE provider_code = $1 AND identifier = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn insert_user_with_identity(
        &self,
        user: &User,
        identity: &AuthIdentity,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, is_active, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.display_name)
        .bind(user.is_active)
        .bind(user.created_utc)
        .execute(&mut *tx)
        .await?;

        insert_identity_row(&mut tx, identity).await?;

        tx.commit().await
    }

    async fn insert_identity(&self, identity: &AuthIdentity) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        insert_identity_row(&mut tx, identity).await?;
        tx.commit().await
    }
}

async fn insert_identity_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    identity: &AuthIdentity,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO auth_identities
            (ident_id, user_id, provider_code, identifier, credential_hash, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(identity.ident_id)
    .bind(identity.user_id)
    .bind(&identity.provider_code)
    .bind(&identity.identifier)
    .bind(&identity.credential_hash)
    .bind(identity.created_utc)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn unique_violation_as(err: sqlx::Error, mapped: ServiceError) -> ServiceError {
    if is_unique_violation(&err) {
        mapped
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalization_folds_case_and_whitespace() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("bob@example.com"), "bob@example.com");
    }
}
