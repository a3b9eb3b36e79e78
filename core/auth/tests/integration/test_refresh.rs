//! Refresh grant against a mocked token endpoint.

use chrono::{Duration, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use liftsync_auth::{AuthConfig, OAuthRefreshClient, RefreshClient};
use liftsync_common::{Error, Secret};

use crate::common;

#[tokio::test]
async fn test_refresh_returns_new_access_token() {
    let server = MockServer::start().await;
    common::mount_token_success(&server, "fresh-access", 3600).await;

    let client = common::refresh_client(&server);
    let refreshed = client
        .refresh(&Secret::from("refresh-1"))
        .await
        .expect("Refresh failed");

    assert_eq!(refreshed.access_token.expose(), "fresh-access");
    assert!(refreshed.refresh_token.is_none());
    assert!(refreshed.expires_at > Utc::now() + Duration::minutes(55));
}

#[tokio::test]
async fn test_refresh_sends_client_credentials_in_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains("client_secret=test-secret"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ok",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::refresh_client(&server);
    client.refresh(&Secret::from("refresh-1")).await.unwrap();
}

#[tokio::test]
async fn test_refresh_keeps_rotated_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "a2",
            "refresh_token": "r2",
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .mount(&server)
        .await;

    let client = common::refresh_client(&server);
    let refreshed = client.refresh(&Secret::from("r1")).await.unwrap();
    assert_eq!(refreshed.refresh_token, Some(Secret::from("r2")));
}

#[tokio::test]
async fn test_rejected_refresh_is_auth_expired() {
    let server = MockServer::start().await;
    common::mount_token_rejected(&server).await;

    let client = common::refresh_client(&server);
    let err = client.refresh(&Secret::from("revoked")).await.unwrap_err();
    assert!(matches!(err, Error::AuthExpired(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_provider_is_remote_unavailable() {
    let config = AuthConfig {
        token_url: "http://127.0.0.1:1/token".to_string(),
        ..Default::default()
    };
    let client = OAuthRefreshClient::new(&config).unwrap();

    let err = client.refresh(&Secret::from("r1")).await.unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable(_)), "got {:?}", err);
    assert!(err.is_transient());
}
