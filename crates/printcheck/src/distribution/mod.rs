//! Distribution stage: put fixtures into the shared Drive folder and take
//! them out again at teardown.

use std::path::Path;

use log::{info, warn};
use tracing::info_span;
use tracing::Instrument;

use crate::drive::{
    AuthSession, CleanupError, DeleteFailure, DriveApiError, DriveClient, DriveFile,
    PermissionRequest, UploadError,
};

const PDF_MIME_TYPE: &str = "application/pdf";

/// Where an uploaded fixture can be found. `url` is the folder URL, not a
/// link to the file itself, so retrieval has to search by `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    pub file_id: String,
    pub file_name: String,
}

/// Outcome of a successful teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
}

#[derive(Clone)]
pub struct Distributor {
    client: DriveClient,
    folder_id: String,
    folder_url: String,
}

impl Distributor {
    pub fn new(client: DriveClient, folder_id: impl Into<String>) -> Self {
        let folder_id = folder_id.into();
        let folder_url = client.folder_url(&folder_id);
        Self {
            client,
            folder_id,
            folder_url,
        }
    }

    /// Uses `url` instead of the derived folder URL.
    pub fn with_folder_url(mut self, url: impl Into<String>) -> Self {
        self.folder_url = url.into();
        self
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn folder_url(&self) -> &str {
        &self.folder_url
    }

    /// Uploads `local_path` into the folder under its file name and makes it
    /// readable by anyone with the link.
    pub async fn upload(
        &self,
        session: &AuthSession,
        local_path: &Path,
    ) -> Result<ShareLink, UploadError> {
        if !local_path.is_file() {
            return Err(UploadError::FileNotFound(local_path.to_path_buf()));
        }

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::FileNotFound(local_path.to_path_buf()))?
            .to_string();

        let span = info_span!("upload", file = %file_name, folder = %self.folder_id);
        async {
            let content =
                tokio::fs::read(local_path)
                    .await
                    .map_err(|e| UploadError::ReadFile {
                        path: local_path.to_path_buf(),
                        source: e,
                    })?;

            let created = self
                .client
                .create_file(session, &file_name, &self.folder_id, PDF_MIME_TYPE, content)
                .await
                .map_err(|e| UploadError::Api {
                    path: local_path.to_path_buf(),
                    source: e,
                })?;

            let file_id = created
                .id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| UploadError::MissingId(local_path.to_path_buf()))?;

            self.client
                .create_permission(session, &file_id, PermissionRequest::public_reader())
                .await
                .map_err(|e| UploadError::Share {
                    path: local_path.to_path_buf(),
                    source: e,
                })?;

            info!("Uploaded {} as {}", file_name, file_id);

            Ok(ShareLink {
                url: self.folder_url.clone(),
                file_id,
                file_name,
            })
        }
        .instrument(span)
        .await
    }

    /// Every live child of the folder, across all pages.
    pub async fn list_children(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<DriveFile>, DriveApiError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_children_page(session, &self.folder_id, page_token.as_deref())
                .await?;
            files.extend(page.files);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(files),
            }
        }
    }

    /// Deletes every child of the folder. Each deletion is attempted even
    /// after earlier ones fail; all failures are reported together.
    pub async fn cleanup(&self, session: &AuthSession) -> Result<CleanupReport, CleanupError> {
        let span = info_span!("cleanup", folder = %self.folder_id);
        async {
            let mut deleted = 0;
            let mut failures = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let page = self
                    .client
                    .list_children_page(session, &self.folder_id, page_token.as_deref())
                    .await
                    .map_err(|e| CleanupError::List {
                        folder_id: self.folder_id.clone(),
                        source: e,
                    })?;

                for file in page.files {
                    let Some(file_id) = file.id else {
                        continue;
                    };
                    let label = file.name.clone().unwrap_or_else(|| file_id.clone());
                    match self.client.delete_file(session, &file_id).await {
                        Ok(()) => {
                            info!("Deleted file: {} ({})", label, file_id);
                            deleted += 1;
                        }
                        Err(e) => {
                            warn!("Failed to delete {} ({}): {}", label, file_id, e);
                            failures.push(DeleteFailure {
                                file_id,
                                file_name: file.name,
                                reason: e.to_string(),
                            });
                        }
                    }
                }

                match page.next_page_token.filter(|t| !t.is_empty()) {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }

            if failures.is_empty() {
                info!("Cleanup removed {} file(s)", deleted);
                Ok(CleanupReport { deleted })
            } else {
                Err(CleanupError::Incomplete {
                    folder_id: self.folder_id.clone(),
                    deleted,
                    failures,
                })
            }
        }
        .instrument(span)
        .await
    }
}
