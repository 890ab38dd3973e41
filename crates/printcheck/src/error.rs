use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::drive::{AuthError, CleanupError, DriveApiError, UploadError};
use crate::inspection::InspectionError;
use crate::retrieval::RetrievalError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum PrintCheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Drive API error: {0}")]
    Drive(#[from] DriveApiError),

    #[error("Distribution failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Cleanup failed: {0}")]
    Cleanup(#[from] CleanupError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Inspection failed: {0}")]
    Inspection(#[from] InspectionError),

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] SecretError),

    #[error("Case '{case}' exceeded its {limit:?} time limit")]
    CaseTimeout { case: String, limit: Duration },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid fixture '{name}': {reason}")]
    InvalidFixture { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PrintCheckError>;
