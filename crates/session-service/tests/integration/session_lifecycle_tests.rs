//! Session lifetime tests.
//!
//! Walks a session through its lifetime by backdating tokens: inside the
//! access window, past it but inside the refresh window, and past both.

use common::jwt::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use common::types::Role;
use reqwest::header::{AUTHORIZATION, COOKIE};
use session_test_utils::{
    cookie_header, tampered, CookieAssertions, TestSessionServer, TestTokenBuilder, TEST_PASSWORD,
};

async fn get_profile(
    server: &TestSessionServer,
    cookie: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .get(format!("{}/api/users/profile", server.url()))
        .header(COOKIE, cookie)
        .send()
        .await?)
}

/// Login sets both cookies and they open protected routes.
#[tokio::test]
async fn test_login_sets_cookies_that_authenticate() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/login", server.url()))
        .json(&serde_json::json!({"email": alice.email, "password": TEST_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    response
        .headers()
        .assert_sets_cookie(ACCESS_TOKEN_COOKIE)
        .assert_sets_cookie(REFRESH_TOKEN_COOKIE)
        .assert_cookie_count(2);

    let access = response.headers().cookie_value(ACCESS_TOKEN_COOKIE).unwrap();
    let refresh = response.headers().cookie_value(REFRESH_TOKEN_COOKIE).unwrap();

    let profile = get_profile(
        &server,
        &cookie_header(&[(ACCESS_TOKEN_COOKIE, &access), (REFRESH_TOKEN_COOKIE, &refresh)]),
    )
    .await?;

    assert_eq!(profile.status(), 200);
    let body: serde_json::Value = profile.json().await?;
    assert_eq!(body["username"], "alice");
    assert!(body["lastLogin"].is_string());

    Ok(())
}

/// Minute 5: the access token is still good and nothing is renewed.
#[tokio::test]
async fn test_access_token_within_window_needs_no_renewal() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let tokens = TestTokenBuilder::new()
        .for_subject(alice.id)
        .issued_minutes_ago(5);

    let response = get_profile(
        &server,
        &cookie_header(&[
            (ACCESS_TOKEN_COOKIE, &tokens.build_access()),
            (REFRESH_TOKEN_COOKIE, &tokens.build_refresh()),
        ]),
    )
    .await?;

    assert_eq!(response.status(), 200);
    response.headers().assert_cookie_count(0);

    Ok(())
}

/// Minute 16: the access token has expired, the refresh token renews it
/// silently and the request succeeds with exactly one new cookie.
#[tokio::test]
async fn test_expired_access_token_is_silently_renewed() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let tokens = TestTokenBuilder::new()
        .for_subject(alice.id)
        .issued_minutes_ago(16);
    let refresh = tokens.build_refresh();

    let response = get_profile(
        &server,
        &cookie_header(&[
            (ACCESS_TOKEN_COOKIE, &tokens.build_access()),
            (REFRESH_TOKEN_COOKIE, &refresh),
        ]),
    )
    .await?;

    assert_eq!(response.status(), 200);
    response
        .headers()
        .assert_sets_cookie(ACCESS_TOKEN_COOKIE)
        .assert_cookie_count(1);

    let renewed = response.headers().cookie_value(ACCESS_TOKEN_COOKIE).unwrap();
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["id"], alice.id.to_string());

    // The renewed token works on its own.
    let follow_up = get_profile(
        &server,
        &cookie_header(&[(ACCESS_TOKEN_COOKIE, &renewed), (REFRESH_TOKEN_COOKIE, &refresh)]),
    )
    .await?;
    assert_eq!(follow_up.status(), 200);
    follow_up.headers().assert_cookie_count(0);

    Ok(())
}

/// Day 8: both tokens have expired and the session is over.
#[tokio::test]
async fn test_expired_refresh_token_ends_session() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let tokens = TestTokenBuilder::new()
        .for_subject(alice.id)
        .issued_days_ago(8);

    let response = get_profile(
        &server,
        &cookie_header(&[
            (ACCESS_TOKEN_COOKIE, &tokens.build_access()),
            (REFRESH_TOKEN_COOKIE, &tokens.build_refresh()),
        ]),
    )
    .await?;

    assert_eq!(response.status(), 401);
    response.headers().assert_cookie_count(0);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "SESSION_EXPIRED");

    Ok(())
}

/// An expired access token with no refresh cookie ends the session.
#[tokio::test]
async fn test_expired_access_without_refresh_cookie() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let access = TestTokenBuilder::new()
        .for_subject(alice.id)
        .issued_minutes_ago(20)
        .build_access();

    let response = get_profile(&server, &cookie_header(&[(ACCESS_TOKEN_COOKIE, &access)])).await?;

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "SESSION_EXPIRED");

    Ok(())
}

/// A tampered access token is rejected outright even with a good refresh
/// cookie present.
#[tokio::test]
async fn test_tampered_access_token_is_not_renewed() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let tokens = TestTokenBuilder::new().for_subject(alice.id);

    let response = get_profile(
        &server,
        &cookie_header(&[
            (ACCESS_TOKEN_COOKIE, &tampered(&tokens.build_access())),
            (REFRESH_TOKEN_COOKIE, &tokens.build_refresh()),
        ]),
    )
    .await?;

    assert_eq!(response.status(), 401);
    response.headers().assert_cookie_count(0);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_TOKEN");

    Ok(())
}

/// A refresh token is not accepted where an access token is expected.
#[tokio::test]
async fn test_refresh_token_cannot_stand_in_for_access_token() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let refresh = TestTokenBuilder::new().for_subject(alice.id).build_refresh();

    let response = reqwest::Client::new()
        .get(format!("{}/api/users/profile", server.url()))
        .header(AUTHORIZATION, format!("Bearer {refresh}"))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_TOKEN");

    Ok(())
}

/// Bearer header authentication works for non-browser clients.
#[tokio::test]
async fn test_bearer_header_authenticates() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let access = server.issuer().issue_access(alice.id, Some(alice.role))?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/users/profile", server.url()))
        .header(AUTHORIZATION, format!("Bearer {access}"))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// No credential at all.
#[tokio::test]
async fn test_missing_token_requires_authentication() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/users/profile", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    assert_eq!(
        response
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");

    Ok(())
}
