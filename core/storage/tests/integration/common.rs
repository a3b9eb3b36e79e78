//! Shared helpers for Drive integration tests.

use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use liftsync_common::{Secret, StaticToken};
use liftsync_storage::{DriveBackupRepository, DriveConfig};

pub const FOLDER_ID: &str = "folder-001";
pub const PAGE_SIZE: u32 = 50;

/// Starts a mock server and returns a repository pointed at it.
pub async fn setup_drive_mock() -> (MockServer, DriveBackupRepository) {
    let server = MockServer::start().await;
    let config = DriveConfig {
        api_base: server.uri(),
        upload_base: format!("{}/upload", server.uri()),
        page_size: PAGE_SIZE,
        ..Default::default()
    };
    let tokens = Arc::new(StaticToken(Secret::from("test-access-token")));
    let repo = DriveBackupRepository::new(config, tokens).expect("Failed to build repository");
    (server, repo)
}

/// Mounts the folder lookup, answering with the folder or nothing.
pub async fn mount_folder_lookup(server: &MockServer, exists: bool) {
    let files = if exists {
        serde_json::json!([{
            "id": FOLDER_ID,
            "name": "LiftSync Backups",
            "mimeType": "application/vnd.google-apps.folder"
        }])
    } else {
        serde_json::json!([])
    };

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts the multipart upload endpoint.
pub async fn mount_upload(server: &MockServer, file_id: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": file_id,
            "name": "liftsync-backup-2026-03-01T10-00-00.000Z.json",
            "mimeType": "application/json",
            "createdTime": "2026-03-01T10:00:00.000Z",
            "parents": [FOLDER_ID]
        })))
        .mount(server)
        .await;
}
