//! Google Drive API client.

use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use liftsync_common::{AccessTokenSource, Error, Result};

/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const JSON_MIME_TYPE: &str = "application/json";

const FILE_FIELDS: &str = "id,name,mimeType,createdTime,parents";
const LIST_FIELDS: &str = "files(id,name,mimeType,createdTime,parents)";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Escape a literal for use inside a Drive query string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Google Drive API client.
///
/// Every request carries a bearer token obtained from the token source, so
/// refreshes happen transparently between calls.
pub struct DriveClient {
    http: Client,
    api_base: String,
    upload_base: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl DriveClient {
    /// Create a new Drive client against the given API endpoints.
    pub fn new(
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent("LiftSync/0.1")
            .build()
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token.expose()))
    }

    /// Find a folder by name, optionally inside a parent.
    pub async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<DriveFile>> {
        let mut query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            quote(name),
            FOLDER_MIME_TYPE
        );
        if let Some(parent) = parent_id {
            query.push_str(&format!(" and '{}' in parents", quote(parent)));
        }

        let files = self.query_files(&query, None, 1).await?;
        Ok(files.into_iter().next())
    }

    /// Create a folder.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        let url = format!("{}/files", self.api_base);
        let auth = self.auth_header().await?;

        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE
        });

        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to create folder: {}", e)))?;

        self.handle_response(response).await
    }

    /// Run a file query, ordered and bounded as requested.
    pub async fn query_files(
        &self,
        query: &str,
        order_by: Option<&str>,
        page_size: u32,
    ) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files", self.api_base);
        let auth = self.auth_header().await?;
        let page_size = page_size.to_string();

        let mut request = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[
                ("q", query),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ]);

        if let Some(order) = order_by {
            request = request.query(&[("orderBy", order)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to list files: {}", e)))?;

        let list_response: FileListResponse = self.handle_response(response).await?;
        debug!("Drive query returned {} files", list_response.files.len());
        Ok(list_response.files)
    }

    /// Upload a small file in one multipart request.
    pub async fn upload_simple(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<DriveFile> {
        let url = format!("{}/files", self.upload_base);
        let auth = self.auth_header().await?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
            "mimeType": mime_type
        });
        let metadata_json = serde_json::to_string(&metadata)?;

        // Build multipart request
        let boundary = "LiftSyncBoundary";
        let mut body = Vec::with_capacity(data.len() + metadata_json.len() + 256);

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata_json.as_bytes());
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .body(body)
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to upload file: {}", e)))?;

        self.handle_response(response).await
    }

    /// Download file content.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}", self.api_base, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to download file: {}", e)))?;

        let response = Self::check_status(response).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to read download: {}", e)))
    }

    /// Delete a file.
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", self.api_base, file_id);
        let auth = self.auth_header().await?;

        let response = self
            .http
            .delete(&url)
            .header(header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to delete file: {}", e)))?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to parse response: {}", e)))
    }

    /// Map a non-success status onto the error taxonomy.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::UNAUTHORIZED {
            Err(Error::AuthExpired("Drive rejected the access token".to_string()))
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound("Drive resource not found".to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::RemoteUnavailable(format!("Drive API error: {} - {}", status, body)))
        }
    }
}
