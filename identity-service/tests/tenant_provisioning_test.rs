//! Tenant provisioning and context switching tests.

mod common;

use common::{cleanup_test_data, fetch_me, signup_email, TestApp};
use uuid::Uuid;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn provisioning_creates_all_four_records() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    signup_email(&app, "alice@example.com", "password123").await;

    let orgs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(orgs, 1);

    let personal: bool = sqlx::query_scalar("SELECT is_personal_default FROM organizations")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(personal);

    let tier: String = sqlx::query_scalar("SELECT tier_code FROM organizations")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(tier, "free");

    let owner_role: String = sqlx::query_scalar("SELECT role_code FROM organization_members")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(owner_role, "owner");

    let default_workspaces: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM workspaces WHERE is_default")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(default_workspaces, 1);

    let ws_role: String = sqlx::query_scalar("SELECT role_code FROM workspace_members")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(ws_role, "admin");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn deleting_last_org_triggers_fresh_provisioning_on_login() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let token = signup_email(&app, "alice@example.com", "password123").await;
    let me: serde_json::Value = fetch_me(&app, &token).await.json().await.unwrap();
    let original_org = me["org_id"].as_str().unwrap().to_string();

    let deleted = app
        .client()
        .delete(format!("{}/orgs/{}", app.address, original_org))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 204);

    let login = app
        .client()
        .post(format!("{}/auth/email/login", app.address))
        .json(&serde_json::json!({
            "email": "alice@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);

    let body: serde_json::Value = login.json().await.unwrap();
    let new_token = body["token"].as_str().unwrap();

    let me: serde_json::Value = fetch_me(&app, new_token).await.json().await.unwrap();
    let new_org = me["org_id"].as_str().unwrap();
    assert_ne!(new_org, original_org, "a fresh organization must be provisioned");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn revoked_membership_rejects_live_token() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let token = signup_email(&app, "alice@example.com", "password123").await;
    assert_eq!(fetch_me(&app, &token).await.status(), 200);

    // Revoke the membership behind the still-unexpired token.
    sqlx::query("DELETE FROM workspace_members")
        .execute(&app.pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM organization_members")
        .execute(&app.pool)
        .await
        .unwrap();

    let response = fetch_me(&app, &token).await;
    assert_eq!(response.status(), 403, "NoLongerMember must be enforced");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn switch_context_issues_new_token_for_other_org() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let token = signup_email(&app, "alice@example.com", "password123").await;

    let created = app
        .client()
        .post(format!("{}/orgs", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "Second Org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);

    let body: serde_json::Value = created.json().await.unwrap();
    let new_org = body["organization"]["org_id"].as_str().unwrap().to_string();

    let switched = app
        .client()
        .post(format!("{}/auth/context/switch", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "organization_id": new_org }))
        .send()
        .await
        .unwrap();
    assert_eq!(switched.status(), 200);

    let session: serde_json::Value = switched.json().await.unwrap();
    let new_token = session["token"].as_str().unwrap();
    assert_ne!(new_token, token, "switching must issue a new credential");

    let me: serde_json::Value = fetch_me(&app, new_token).await.json().await.unwrap();
    assert_eq!(me["org_id"].as_str().unwrap(), new_org);

    // The original credential still works for the original context.
    assert_eq!(fetch_me(&app, &token).await.status(), 200);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn switch_to_foreign_org_is_forbidden() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let alice = signup_email(&app, "alice@example.com", "password123").await;
    let bob = signup_email(&app, "bob@example.com", "password123").await;

    let bob_me: serde_json::Value = fetch_me(&app, &bob).await.json().await.unwrap();
    let bob_org = bob_me["org_id"].as_str().unwrap();

    let switched = app
        .client()
        .post(format!("{}/auth/context/switch", app.address))
        .bearer_auth(&alice)
        .json(&serde_json::json!({ "organization_id": bob_org }))
        .send()
        .await
        .unwrap();
    assert_eq!(switched.status(), 403);

    let missing = app
        .client()
        .post(format!("{}/auth/context/switch", app.address))
        .bearer_auth(&alice)
        .json(&serde_json::json!({ "organization_id": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn workspace_creation_requires_admin_rights() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    cleanup_test_data(&app.pool).await.expect("Failed to cleanup");

    let alice = signup_email(&app, "alice@example.com", "password123").await;
    let bob = signup_email(&app, "bob@example.com", "password123").await;

    let alice_me: serde_json::Value = fetch_me(&app, &alice).await.json().await.unwrap();
    let alice_org = alice_me["org_id"].as_str().unwrap().to_string();

    let ok = app
        .client()
        .post(format!("{}/orgs/{}/workspaces", app.address, alice_org))
        .bearer_auth(&alice)
        .json(&serde_json::json!({ "name": "Staging" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 201);

    let forbidden = app
        .client()
        .post(format!("{}/orgs/{}/workspaces", app.address, alice_org))
        .bearer_auth(&bob)
        .json(&serde_json::json!({ "name": "Intruder" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
}
