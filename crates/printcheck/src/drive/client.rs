//! Thin client over the Drive v3 REST API.

use std::time::Duration;

use log::debug;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::auth::AuthSession;
use super::error::{DriveApiError, Result};
use super::types::{DriveFile, FileList, FileMetadata, PermissionRequest};
use crate::sanitize::truncate_body;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Uploads carry whole PDFs, so allow more than a metadata call needs.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Base URLs for every remote endpoint the suite talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
    pub folder_url_base: String,
    pub device_code_url: String,
    pub token_url: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            folder_url_base: "https://drive.google.com/drive/folders".to_string(),
            device_code_url: "https://oauth2.googleapis.com/device/code".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl DriveEndpoints {
    /// Points every endpoint at one server, for mocks.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: format!("{}/drive/v3", base),
            upload_base: format!("{}/upload/drive/v3", base),
            folder_url_base: format!("{}/drive/folders", base),
            device_code_url: format!("{}/device/code", base),
            token_url: format!("{}/token", base),
        }
    }
}

pub(crate) fn create_http_client() -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    endpoints: DriveEndpoints,
}

impl DriveClient {
    pub fn new(endpoints: DriveEndpoints) -> Result<Self> {
        Ok(Self {
            http: create_http_client()?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &DriveEndpoints {
        &self.endpoints
    }

    /// Public URL of a folder.
    pub fn folder_url(&self, folder_id: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.folder_url_base.trim_end_matches('/'),
            folder_id
        )
    }

    /// `files.create` with `uploadType=multipart`, returning the created file.
    pub async fn create_file(
        &self,
        session: &AuthSession,
        name: &str,
        parent: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile> {
        let metadata = serde_json::to_string(&FileMetadata {
            name,
            parents: [parent],
        })
        .map_err(|e| DriveApiError::Decode(e.to_string()))?;

        let boundary = format!("printcheck-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, mime_type, &content);

        debug!("Creating '{}' in folder {} ({} bytes)", name, parent, content.len());

        let response = self
            .http
            .post(format!("{}/files", self.endpoints.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .bearer_auth(session.access_token().expose_secret())
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        decode(check_status(response).await?).await
    }

    /// `permissions.create` on a file.
    pub async fn create_permission(
        &self,
        session: &AuthSession,
        file_id: &str,
        permission: PermissionRequest,
    ) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/files/{}/permissions", self.endpoints.api_base, file_id))
            .bearer_auth(session.access_token().expose_secret())
            .json(&permission)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// One page of the live children of `folder_id`.
    pub async fn list_children_page(
        &self,
        session: &AuthSession,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FileList> {
        let query = format!(
            "'{}' in parents and trashed = false",
            folder_id.replace('\'', "\\'")
        );
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query.as_str()),
            ("fields", "nextPageToken, files(id, name)"),
            ("spaces", "drive"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response = self
            .http
            .get(format!("{}/files", self.endpoints.api_base))
            .query(&params)
            .bearer_auth(session.access_token().expose_secret())
            .send()
            .await?;

        decode(check_status(response).await?).await
    }

    pub async fn delete_file(&self, session: &AuthSession, file_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/files/{}", self.endpoints.api_base, file_id))
            .bearer_auth(session.access_token().expose_secret())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

fn multipart_related_body(
    boundary: &str,
    metadata: &str,
    mime_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata,
            t = mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveApiError::Status {
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| DriveApiError::Decode(e.to_string()))
}
