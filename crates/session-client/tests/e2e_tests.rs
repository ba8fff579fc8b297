//! End-to-end tests against a spawned session service.
//!
//! The client keeps its session in a reqwest cookie store exactly as a
//! browser would. Seeding that store with only a refresh cookie reproduces a
//! client whose 15-minute access cookie has aged out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::secret::SecretString;
use common::types::Role;
use session_client::{ApiRequest, AuthClient, ClientConfig, ClientError, HttpTransport};
use session_test_utils::{TestSessionServer, TestTokenBuilder, TEST_PASSWORD};
use std::sync::Arc;

/// Client whose cookie store holds only the given refresh token.
fn client_with_refresh_cookie(
    server: &TestSessionServer,
    refresh_token: &str,
) -> Result<AuthClient, anyhow::Error> {
    let config = ClientConfig::new(server.url());
    let jar = Arc::new(reqwest::cookie::Jar::default());
    jar.add_cookie_str(
        &format!("refreshToken={refresh_token}; Path=/"),
        &reqwest::Url::parse(&server.url())?,
    );
    let transport = Arc::new(HttpTransport::with_cookie_jar(&config, jar)?);
    Ok(AuthClient::with_transport(config, transport))
}

#[tokio::test]
async fn test_login_profile_logout_round() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let client = AuthClient::new(ClientConfig::new(server.url()))?;

    let user = client
        .login(&alice.email, &SecretString::from(TEST_PASSWORD))
        .await?;
    assert_eq!(user.id, alice.id);
    assert!(client.session().is_authenticated());

    let profile = client.fetch_profile().await?;
    assert_eq!(profile.username, "alice");
    assert_eq!(client.coordinator().renewal_count(), 0);

    client.logout().await?;
    assert!(!client.session().is_authenticated());

    // Both cookies are gone: renewal is attempted once and refused.
    let err = client.fetch_profile().await.unwrap_err();
    assert_eq!(err, ClientError::SessionExpired);
    assert_eq!(client.coordinator().renewal_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_wrong_password_is_not_renewed() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let client = AuthClient::new(ClientConfig::new(server.url()))?;

    let err = client
        .login(&alice.email, &SecretString::from("not-it"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(client.coordinator().renewal_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_renewal() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let refresh = server.issuer().issue_refresh(alice.id)?;
    let client = client_with_refresh_cookie(&server, &refresh)?;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.execute(ApiRequest::get("/api/users/profile")).await
        }));
    }

    for handle in handles {
        let response = handle.await??;
        assert_eq!(response.status, 200);
    }

    // Late 401s for requests sent before the renewal replay on its result.
    assert_eq!(client.coordinator().renewal_count(), 1);
    assert!(!client.coordinator().is_refreshing());
    assert!(client.session().is_authenticated());

    Ok(())
}

#[tokio::test]
async fn test_startup_restores_session_from_refresh_cookie() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let refresh = server.issuer().issue_refresh(alice.id)?;
    let client = client_with_refresh_cookie(&server, &refresh)?;

    assert!(client.init().await);

    assert_eq!(client.session().current().map(|u| u.id), Some(alice.id));
    assert_eq!(client.coordinator().renewal_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_expired_refresh_cookie_fails_with_session_expired() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let alice = server.create_user("alice", Role::User).await?;
    let refresh = TestTokenBuilder::new()
        .for_subject(alice.id)
        .issued_days_ago(8)
        .build_refresh();
    let client = client_with_refresh_cookie(&server, &refresh)?;

    let err = client
        .execute(ApiRequest::get("/api/users/profile"))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::SessionExpired);
    assert!(!client.coordinator().is_refreshing());

    Ok(())
}
