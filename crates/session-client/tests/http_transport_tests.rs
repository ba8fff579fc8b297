//! HTTP transport and coordinator behaviour against a stub server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use session_client::{
    ApiRequest, ClientConfig, ClientError, HttpTransport, Method, RefreshCoordinator,
    SessionStore, Transport,
};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_transport_sends_method_path_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&ClientConfig::new(server.uri())).unwrap();
    let request = ApiRequest::json(
        Method::Post,
        "/api/users/login",
        &json!({"email": "ada@example.com", "password": "hunter22"}),
    )
    .unwrap();

    let response = transport.send(&request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json::<serde_json::Value>().unwrap()["ok"], true);
}

#[tokio::test]
async fn test_transport_replays_cookies_from_earlier_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "accessToken=abc; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("cookie", "accessToken=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&ClientConfig::new(server.uri())).unwrap();
    transport
        .send(&ApiRequest::post("/api/users/login"))
        .await
        .unwrap();

    let response = transport
        .send(&ApiRequest::get("/api/users/profile"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_transport_returns_error_statuses_as_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"error": "Access denied", "code": "FORBIDDEN"})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&ClientConfig::new(server.uri())).unwrap();
    let response = transport.send(&ApiRequest::get("/api/users")).await.unwrap();

    assert_eq!(response.status, 403);
    assert_eq!(
        response.into_error(),
        ClientError::Api {
            status: 403,
            code: Some("FORBIDDEN".to_string()),
            message: "Access denied".to_string(),
        }
    );
}

#[tokio::test]
async fn test_transport_connection_failure_is_http_error() {
    let transport = HttpTransport::new(&ClientConfig::new("http://127.0.0.1:1")).unwrap();

    let err = transport.send(&ApiRequest::get("/health")).await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
}

#[tokio::test]
async fn test_coordinator_renews_over_http_and_replays() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Session expired", "code": "SESSION_EXPIRED"})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Tokens refreshed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri());
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let coordinator = RefreshCoordinator::new(transport, SessionStore::new(), &config);

    let response = coordinator.execute(ApiRequest::get("/api/events")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(coordinator.renewal_count(), 1);
}

#[tokio::test]
async fn test_coordinator_maps_refused_renewal_to_session_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Authentication required"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Session expired", "code": "SESSION_EXPIRED"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri());
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let coordinator = RefreshCoordinator::new(transport, SessionStore::new(), &config);

    let err = coordinator
        .execute(ApiRequest::get("/api/events"))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::SessionExpired);
}
