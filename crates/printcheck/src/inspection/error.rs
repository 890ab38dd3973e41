use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("PDF requires a password but none was provided")]
    PasswordRequired,

    #[error("Incorrect password for PDF")]
    IncorrectPassword,

    #[error("Unsupported security handler: {0}")]
    UnsupportedSecurity(String),

    #[error("Malformed encryption dictionary: {0}")]
    MalformedEncryption(String),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PDF: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, InspectionError>;
