//! Registration, login, renewal and logout over HTTP.

use common::jwt::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use common::types::Role;
use reqwest::header::COOKIE;
use serde_json::json;
use session_test_utils::{
    cookie_header, CookieAssertions, TestSessionServer, TestTokenBuilder, TEST_PASSWORD,
};

#[tokio::test]
async fn test_register_returns_created_with_cookies() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/register", server.url()))
        .json(&json!({
            "username": "grace",
            "email": "Grace@Example.com",
            "password": "cobol1959",
            "profile": {"firstName": "Grace", "organization": "Navy"}
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 201);
    response.headers().assert_cookie_count(2);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user"]["email"], "grace@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["profile"]["firstName"], "Grace");

    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    server.create_user("alice", Role::User).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/register", server.url()))
        .json(&json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "another1"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "Email already in use");

    Ok(())
}

#[tokio::test]
async fn test_login_with_wrong_password() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/login", server.url()))
        .json(&json!({"email": alice.email, "password": "not-the-password"}))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    response.headers().assert_cookie_count(0);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    Ok(())
}

#[tokio::test]
async fn test_login_to_deactivated_account() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    server.users().set_active(alice.id, false).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/login", server.url()))
        .json(&json!({"email": alice.email, "password": TEST_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "ACCOUNT_DISABLED");

    Ok(())
}

/// The refresh endpoint reissues both tokens from the refresh cookie alone.
#[tokio::test]
async fn test_refresh_endpoint_reissues_pair() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let refresh = TestTokenBuilder::new()
        .for_subject(alice.id)
        .issued_days_ago(3)
        .build_refresh();

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/refresh", server.url()))
        .header(COOKIE, cookie_header(&[(REFRESH_TOKEN_COOKIE, &refresh)]))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    response
        .headers()
        .assert_sets_cookie(ACCESS_TOKEN_COOKIE)
        .assert_sets_cookie(REFRESH_TOKEN_COOKIE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user"]["username"], "alice");

    Ok(())
}

#[tokio::test]
async fn test_refresh_for_deactivated_account() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let refresh = TestTokenBuilder::new().for_subject(alice.id).build_refresh();
    server.users().set_active(alice.id, false).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/refresh", server.url()))
        .header(COOKIE, cookie_header(&[(REFRESH_TOKEN_COOKIE, &refresh)]))
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    response.headers().assert_cookie_count(0);

    Ok(())
}

#[tokio::test]
async fn test_logout_expires_both_cookies() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/logout", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let cookies = response.headers().set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    Ok(())
}
