use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("File '{name}' not visible in the shared folder after {waited:?}")]
    FileNotFound { name: String, waited: Duration },

    #[error("PDF content did not load or is not visible after {waited:?}")]
    Render { waited: Duration },

    #[error("'{name}' asks for a password but none is configured")]
    PasswordRequired { name: String },

    #[error("Timed out after {limit:?} waiting for {step}")]
    Timeout { step: String, limit: Duration },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Failed to move download to '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RetrievalError {
    pub(crate) fn timeout(step: impl Into<String>, limit: Duration) -> Self {
        RetrievalError::Timeout {
            step: step.into(),
            limit,
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
