//! Role gate integration tests.
//!
//! `GET /api/users` is admin only. The role always comes from the identity
//! store, never from the token.

use common::types::Role;
use reqwest::header::COOKIE;
use session_test_utils::{TestSessionServer, TestTokenBuilder};

async fn list_users(
    server: &TestSessionServer,
    cookie: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .get(format!("{}/api/users", server.url()))
        .header(COOKIE, cookie)
        .send()
        .await?)
}

#[tokio::test]
async fn test_admin_can_list_users() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let admin = server.create_user("root", Role::Admin).await?;
    server.create_user("alice", Role::User).await?;

    let response = list_users(&server, &server.session_cookie(&admin)?).await?;

    assert_eq!(response.status(), 200);
    let body: Vec<serde_json::Value> = response.json().await?;
    assert_eq!(body.len(), 2);
    assert!(body.iter().all(|u| u.get("passwordHash").is_none()));

    Ok(())
}

#[tokio::test]
async fn test_plain_user_is_forbidden() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;

    let response = list_users(&server, &server.session_cookie(&alice)?).await?;

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "FORBIDDEN");

    Ok(())
}

/// A token claiming `admin` does not override the stored role.
#[tokio::test]
async fn test_role_claim_in_token_is_ignored() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let forged_role = TestTokenBuilder::new()
        .for_subject(alice.id)
        .with_role(Role::Admin)
        .build_access();

    let response = list_users(&server, &format!("accessToken={forged_role}")).await?;

    assert_eq!(response.status(), 403);

    Ok(())
}

/// A valid token for an account that has since been deleted.
#[tokio::test]
async fn test_deleted_identity_is_not_found() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let admin = server.create_user("root", Role::Admin).await?;
    let cookie = server.session_cookie(&admin)?;
    server.users().remove(admin.id).await?;

    let response = list_users(&server, &cookie).await?;

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "NOT_FOUND");

    Ok(())
}

/// Silent renewal mints a role-less access token; the gate still resolves
/// the admin role from the store.
#[tokio::test]
async fn test_admin_passes_gate_after_silent_renewal() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let admin = server.create_user("root", Role::Admin).await?;
    let tokens = TestTokenBuilder::new()
        .for_subject(admin.id)
        .with_role(Role::Admin)
        .issued_minutes_ago(30);

    let response = list_users(
        &server,
        &format!(
            "accessToken={}; refreshToken={}",
            tokens.build_access(),
            tokens.build_refresh()
        ),
    )
    .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get_all("set-cookie").iter().count(), 1);

    Ok(())
}
