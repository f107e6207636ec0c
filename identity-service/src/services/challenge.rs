//! Single-use sign-in challenges.
//!
//! A challenge is a short-lived nonce bound to one (chain family,
//! address) pair. At most one challenge is live per pair - issuing a
//! new one overwrites the old - and consumption is a single atomic
//! compare-and-delete so concurrent verification attempts cannot both
//! succeed against the same nonce.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::services::signer::{normalize_address, ChainFamily};
use crate::services::ServiceError;

/// Result of an atomic consume attempt against the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    NotFound,
    Expired,
    Mismatch,
}

/// Key-value store holding live challenges with per-key expiry.
///
/// Implementations must make `consume` atomic: exactly one of any
/// number of concurrent matching calls may observe `Consumed`.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn put(&self, key: &str, message: &str, ttl_seconds: i64) -> Result<(), anyhow::Error>;
    async fn consume(&self, key: &str, message: &str) -> Result<ConsumeOutcome, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

/// Compare-and-delete in one server-side step. Returns 1 when the
/// stored message matched and was deleted, 0 when absent, -1 on
/// mismatch (the record is retained until its TTL runs out).
const CONSUME_SCRIPT: &str = r#"
local stored = redis.call('GET', KEYS[1])
if not stored then
  return 0
end
if stored == ARGV[1] then
  redis.call('DEL', KEYS[1])
  return 1
end
return -1
"#;

#[derive(Clone)]
pub struct RedisChallengeStore {
    manager: ConnectionManager,
    consume_script: Arc<redis::Script>,
}

impl RedisChallengeStore {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %url, "Connecting to Redis challenge store");
        let client = redis::Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            manager,
            consume_script: Arc::new(redis::Script::new(CONSUME_SCRIPT)),
        })
    }
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put(&self, key: &str, message: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(message)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store challenge: {}", e))
    }

    async fn consume(&self, key: &str, message: &str) -> Result<ConsumeOutcome, anyhow::Error> {
        let mut conn = self.manager.clone();
        let outcome: i64 = self
            .consume_script
            .key(key)
            .arg(message)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to consume challenge: {}", e))?;

        Ok(match outcome {
            1 => ConsumeOutcome::Consumed,
            // Redis folds expiry into absence via the key TTL.
            0 => ConsumeOutcome::NotFound,
            _ => ConsumeOutcome::Mismatch,
        })
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-process store for tests and single-node development.
pub struct InMemoryChallengeStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl Default for InMemoryChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn put(&self, key: &str, message: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Challenge store mutex poisoned: {}", e))?
            .insert(key.to_string(), (message.to_string(), expires_at));
        Ok(())
    }

    async fn consume(&self, key: &str, message: &str) -> Result<ConsumeOutcome, anyhow::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Challenge store mutex poisoned: {}", e))?;

        let outcome = match entries.get(key) {
            None => ConsumeOutcome::NotFound,
            Some((_, expires_at)) if *expires_at < Utc::now() => ConsumeOutcome::Expired,
            Some((stored, _)) if stored != message => ConsumeOutcome::Mismatch,
            Some(_) => ConsumeOutcome::Consumed,
        };

        // Consumed and expired entries both leave the store; a
        // mismatch keeps the record until its TTL.
        if matches!(outcome, ConsumeOutcome::Consumed | ConsumeOutcome::Expired) {
            entries.remove(key);
        }

        Ok(outcome)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Issued challenge returned to the client.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub message: String,
    pub expires_in: i64,
}

/// Challenge issuance and consumption, store-agnostic.
#[derive(Clone)]
pub struct ChallengeService {
    store: Arc<dyn ChallengeStore>,
    domain: String,
    ttl_seconds: i64,
}

impl ChallengeService {
    pub fn new(store: Arc<dyn ChallengeStore>, domain: String, ttl_seconds: i64) -> Self {
        Self {
            store,
            domain,
            ttl_seconds,
        }
    }

    /// Issue a fresh challenge for the pair, overwriting any live one.
    pub async fn issue(
        &self,
        chain: ChainFamily,
        address: &str,
    ) -> Result<IssuedChallenge, ServiceError> {
        let address = normalize_address(chain, address)?;
        let nonce = generate_nonce();
        let message = signin_message(chain, &self.domain, &address, &nonce);

        self.store
            .put(&challenge_key(chain, &address), &message, self.ttl_seconds)
            .await
            .map_err(ServiceError::Internal)?;

        tracing::debug!(chain = chain.as_str(), address = %address, "Challenge issued");

        Ok(IssuedChallenge {
            message,
            expires_in: self.ttl_seconds,
        })
    }

    /// Atomically consume the live challenge for the pair. The signed
    /// message presented by the client must equal the stored message
    /// byte for byte.
    pub async fn consume(
        &self,
        chain: ChainFamily,
        address: &str,
        signed_message: &str,
    ) -> Result<(), ServiceError> {
        let address = normalize_address(chain, address)?;
        let outcome = self
            .store
            .consume(&challenge_key(chain, &address), signed_message)
            .await
            .map_err(ServiceError::Internal)?;

        match outcome {
            ConsumeOutcome::Consumed => Ok(()),
            ConsumeOutcome::NotFound => Err(ServiceError::ChallengeNotFound),
            ConsumeOutcome::Expired => Err(ServiceError::ChallengeExpired),
            ConsumeOutcome::Mismatch => Err(ServiceError::ChallengeMismatch),
        }
    }

    pub async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.store.health_check().await
    }
}

fn challenge_key(chain: ChainFamily, address: &str) -> String {
    format!("challenge:{}:{}", chain.as_str(), address)
}

fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let nonce_bytes: [u8; 32] = rng.gen();
    hex::encode(nonce_bytes)
}

/// Human-readable sign-in message per the chain family's convention.
pub fn signin_message(chain: ChainFamily, domain: &str, address: &str, nonce: &str) -> String {
    format!(
        "{} wants you to sign in with your {} account:\n{}\n\nNonce: {}",
        domain,
        chain.display_name(),
        address,
        nonce
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ChallengeService {
        ChallengeService::new(
            Arc::new(InMemoryChallengeStore::new()),
            "assistants.example.com".to_string(),
            300,
        )
    }

    const ADDRESS: &str = "0xAbCdEf0123456789aBcDeF0123456789abcdef01";

    #[tokio::test]
    async fn issue_then_consume_succeeds_once() {
        let svc = service();
        let challenge = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();

        svc.consume(ChainFamily::Evm, ADDRESS, &challenge.message)
            .await
            .unwrap();

        let err = svc
            .consume(ChainFamily::Evm, ADDRESS, &challenge.message)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ChallengeNotFound));
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_challenge() {
        let svc = service();
        let first = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();
        let second = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();
        assert_ne!(first.message, second.message);

        let err = svc
            .consume(ChainFamily::Evm, ADDRESS, &first.message)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ChallengeMismatch));

        svc.consume(ChainFamily::Evm, ADDRESS, &second.message)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn message_embeds_domain_address_and_nonce() {
        let svc = service();
        let challenge = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();

        assert!(challenge.message.contains("assistants.example.com"));
        assert!(challenge.message.contains("Ethereum"));
        assert!(challenge.message.contains(&ADDRESS.to_lowercase()));
        assert!(challenge.message.contains("Nonce: "));
        assert_eq!(challenge.expires_in, 300);
    }

    #[tokio::test]
    async fn challenges_are_scoped_per_chain_and_address() {
        let svc = service();
        let challenge = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();

        let other = "0x1111111111111111111111111111111111111111";
        let err = svc
            .consume(ChainFamily::Evm, other, &challenge.message)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ChallengeNotFound));
    }
}
