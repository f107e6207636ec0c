//! Challenge lifecycle tests against the in-memory store.
//!
//! These run without external services; the Redis store implements
//! the same compare-and-delete contract server-side.

use std::sync::Arc;

use identity_service::services::challenge::{ChallengeService, InMemoryChallengeStore};
use identity_service::services::signer::ChainFamily;
use identity_service::services::ServiceError;
use tokio::task::JoinSet;

const ADDRESS: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

fn service_with_ttl(ttl_seconds: i64) -> ChallengeService {
    ChallengeService::new(
        Arc::new(InMemoryChallengeStore::new()),
        "assistants.test".to_string(),
        ttl_seconds,
    )
}

#[tokio::test]
async fn sequential_issues_leave_only_the_latest_consumable() {
    let svc = service_with_ttl(300);

    let first = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();
    let second = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();

    let err = svc
        .consume(ChainFamily::Evm, ADDRESS, &first.message)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ChallengeMismatch));

    svc.consume(ChainFamily::Evm, ADDRESS, &second.message)
        .await
        .expect("latest challenge must be consumable");
}

#[tokio::test]
async fn consumed_challenge_is_gone() {
    let svc = service_with_ttl(300);
    let challenge = svc.issue(ChainFamily::Solana, SOLANA_ADDRESS).await.unwrap();

    svc.consume(ChainFamily::Solana, SOLANA_ADDRESS, &challenge.message)
        .await
        .unwrap();

    let err = svc
        .consume(ChainFamily::Solana, SOLANA_ADDRESS, &challenge.message)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ChallengeNotFound));
}

const SOLANA_ADDRESS: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

#[tokio::test]
async fn concurrent_consumption_has_exactly_one_winner() {
    let svc = Arc::new(service_with_ttl(300));
    let challenge = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let svc = svc.clone();
        let message = challenge.message.clone();
        tasks.spawn(async move { svc.consume(ChainFamily::Evm, ADDRESS, &message).await });
    }

    let mut successes = 0;
    while let Some(result) = tasks.join_next().await {
        if result.expect("task panicked").is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1, "exactly one concurrent consume may win");
}

#[tokio::test]
async fn expired_challenge_is_rejected() {
    let svc = service_with_ttl(0);
    let challenge = svc.issue(ChainFamily::Evm, ADDRESS).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let err = svc
        .consume(ChainFamily::Evm, ADDRESS, &challenge.message)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ChallengeExpired));
}

#[tokio::test]
async fn unknown_pair_is_not_found() {
    let svc = service_with_ttl(300);
    let err = svc
        .consume(ChainFamily::Evm, ADDRESS, "never issued")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ChallengeNotFound));
}

#[tokio::test]
async fn malformed_address_is_rejected_at_issue() {
    let svc = service_with_ttl(300);
    let err = svc.issue(ChainFamily::Evm, "not-an-address").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidWalletAddress(_)));
}
