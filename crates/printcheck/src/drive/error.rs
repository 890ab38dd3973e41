//! Drive and OAuth error types.

use std::path::PathBuf;

use thiserror::Error;

/// A single failed call against the Drive REST API.
#[derive(Error, Debug)]
pub enum DriveApiError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Drive API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode Drive API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DriveApiError {
    fn from(err: reqwest::Error) -> Self {
        DriveApiError::Http(err.to_string())
    }
}

/// Errors obtaining an [`AuthSession`](super::AuthSession). All of them are
/// fatal for suite setup.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to read credentials file '{path}': {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials file '{path}': {reason}")]
    ParseCredentials { path: PathBuf, reason: String },

    #[error("Failed to read token file '{path}': {source}")]
    ReadToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse token file '{path}': {source}")]
    ParseToken {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write token file '{path}': {source}")]
    WriteToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OAuth2 error: {0}")]
    OAuth2(String),

    #[error("Client secret unavailable: {0}")]
    ClientSecret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed for file \"{path}\": {source}")]
    Api {
        path: PathBuf,
        #[source]
        source: DriveApiError,
    },

    #[error("File \"{0}\" uploaded but no ID returned by Drive API")]
    MissingId(PathBuf),

    #[error("Failed to share \"{path}\" publicly: {source}")]
    Share {
        path: PathBuf,
        #[source]
        source: DriveApiError,
    },
}

/// One child of the shared folder that could not be deleted.
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    pub file_id: String,
    pub file_name: Option<String>,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Failed to list folder {folder_id}: {source}")]
    List {
        folder_id: String,
        #[source]
        source: DriveApiError,
    },

    #[error(
        "Failed to cleanup folder {folder_id}: {} of {} deletions failed ({})",
        .failures.len(),
        .failures.len() + .deleted,
        summarize(.failures)
    )]
    Incomplete {
        folder_id: String,
        deleted: usize,
        failures: Vec<DeleteFailure>,
    },
}

fn summarize(failures: &[DeleteFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.file_id, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, DriveApiError>;
