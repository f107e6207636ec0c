//! End-to-end authentication flow tests.

mod common;

use common::{
    cleanup_test_data, fetch_me, request_challenge, signup_email, wallet_login, TestApp,
    TestWallet,
};

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn signup_issues_session_scoped_to_fresh_tenant() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let token = signup_email(&app, "alice@example.com", "password123").await;

    let response = fetch_me(&app, &token).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.get("org_id").is_some());
    assert!(body.get("workspace_id").is_some());

    // Provisioned creator is owner + workspace admin, so the full
    // permission set is present.
    let perms: Vec<String> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap().to_string())
        .collect();
    assert!(perms.contains(&"org:delete".to_string()));
    assert!(perms.contains(&"assistant:deploy".to_string()));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn login_hides_whether_email_exists() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    signup_email(&app, "bob@example.com", "password123").await;
    let client = app.client();

    let wrong_password = client
        .post(format!("{}/auth/email/login", app.address))
        .json(&serde_json::json!({
            "email": "bob@example.com",
            "password": "wrong-password"
        }))
        .send()
        .await
        .unwrap();

    let unknown_email = client
        .post(format!("{}/auth/email/login", app.address))
        .json(&serde_json::json!({
            "email": "nobody@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), 401);
    assert_eq!(unknown_email.status(), 401);

    let a: serde_json::Value = wrong_password.json().await.unwrap();
    let b: serde_json::Value = unknown_email.json().await.unwrap();
    assert_eq!(a["error"], b["error"], "errors must be indistinguishable");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn email_is_case_insensitive_and_signup_collides() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    signup_email(&app, "carol@example.com", "password123").await;

    let duplicate = app
        .client()
        .post(format!("{}/auth/email/signup", app.address))
        .json(&serde_json::json!({
            "email": "Carol@Example.COM",
            "password": "password456",
            "display_name": "Carol Again"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    let login = app
        .client()
        .post(format!("{}/auth/email/login", app.address))
        .json(&serde_json::json!({
            "email": "CAROL@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn wallet_verify_creates_user_and_rejects_replay() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let wallet = TestWallet::new();
    let message = request_challenge(&app, &wallet.address).await;
    let signature = wallet.sign(&message);

    let verify = app
        .client()
        .post(format!("{}/auth/solana/verify", app.address))
        .json(&serde_json::json!({
            "address": wallet.address,
            "signed_message": message,
            "signature": signature
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(verify.status(), 200);

    // Exactly one user with one wallet identity was created.
    let identities: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM auth_identities WHERE provider_code = 'solana'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(identities, 1);

    // The nonce was consumed: replaying the same signed message and
    // signature must fail.
    let replay = app
        .client()
        .post(format!("{}/auth/solana/verify", app.address))
        .json(&serde_json::json!({
            "address": wallet.address,
            "signed_message": message,
            "signature": signature
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn wallet_verify_rejects_signature_over_wrong_message() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let wallet = TestWallet::new();
    let message = request_challenge(&app, &wallet.address).await;
    let signature = wallet.sign("a different message entirely");

    let verify = app
        .client()
        .post(format!("{}/auth/solana/verify", app.address))
        .json(&serde_json::json!({
            "address": wallet.address,
            "signed_message": message,
            "signature": signature
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(verify.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn returning_wallet_resolves_to_same_user() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let wallet = TestWallet::new();
    let first_token = wallet_login(&app, &wallet).await;
    let second_token = wallet_login(&app, &wallet).await;

    let first: serde_json::Value = fetch_me(&app, &first_token).await.json().await.unwrap();
    let second: serde_json::Value = fetch_me(&app, &second_token).await.json().await.unwrap();
    assert_eq!(first["user_id"], second["user_id"]);
    assert_eq!(first["org_id"], second["org_id"]);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
}
