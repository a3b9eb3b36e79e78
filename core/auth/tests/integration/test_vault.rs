//! HTTP token vault against a mocked vault service.

use chrono::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use liftsync_auth::{CredentialTier, HttpTokenVault};
use liftsync_common::Error;

use crate::common;

const CREDENTIAL_PATH: &str = "/credentials/lifter@example.com";

#[tokio::test]
async fn test_vault_read_missing_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CREDENTIAL_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let vault = HttpTokenVault::new(&server.uri()).unwrap();
    assert!(vault.read(&common::user()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_vault_read_returns_credential() {
    let server = MockServer::start().await;
    let stored = common::credential("vault-access", Duration::hours(1), Some("vault-refresh"));
    Mock::given(method("GET"))
        .and(path(CREDENTIAL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&stored))
        .mount(&server)
        .await;

    let vault = HttpTokenVault::new(&server.uri()).unwrap();
    let read = vault.read(&common::user()).await.unwrap();
    assert_eq!(read, Some(stored));
}

#[tokio::test]
async fn test_vault_write_puts_json() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(CREDENTIAL_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let vault = HttpTokenVault::new(&server.uri()).unwrap();
    vault
        .write(&common::credential("a", Duration::hours(1), None))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vault_server_error_is_remote_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CREDENTIAL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let vault = HttpTokenVault::new(&server.uri()).unwrap();
    let err = vault.read(&common::user()).await.unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable(_)));
}

#[tokio::test]
async fn test_vault_delete_tolerates_missing() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(CREDENTIAL_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let vault = HttpTokenVault::new(&server.uri()).unwrap();
    vault.remove(&common::user()).await.unwrap();
}
