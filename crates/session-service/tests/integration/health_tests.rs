//! Health and metrics endpoint integration tests.

use session_test_utils::TestSessionServer;

/// `/health` returns plain text "OK".
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// `/metrics` is public and answers in Prometheus text format.
#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

/// Unknown routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestSessionServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/nonexistent", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}
