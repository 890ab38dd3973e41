//! Google Drive v3 access: OAuth session handling and the REST calls the
//! distribution stage needs.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod device_auth;
pub mod error;
pub mod types;

pub use auth::{AuthSession, Authenticator};
pub use client::{DriveClient, DriveEndpoints};
pub use credentials::{InstalledCredentials, StoredToken};
pub use device_auth::{DeviceFlowAuth, DRIVE_FILE_SCOPE};
pub use error::{AuthError, CleanupError, DeleteFailure, DriveApiError, UploadError};
pub use types::{DriveFile, FileList, PermissionRequest};
