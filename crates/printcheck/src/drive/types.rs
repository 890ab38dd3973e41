use serde::{Deserialize, Serialize};

/// The subset of a Drive `File` resource the suite asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Metadata part of a multipart create.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata<'a> {
    pub name: &'a str,
    pub parents: [&'a str; 1],
}

/// One page of `files.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionRole {
    Reader,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionGrantee {
    Anyone,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionRequest {
    pub role: PermissionRole,
    #[serde(rename = "type")]
    pub grantee: PermissionGrantee,
}

impl PermissionRequest {
    /// Reader access for anyone holding the link.
    pub fn public_reader() -> Self {
        Self {
            role: PermissionRole::Reader,
            grantee: PermissionGrantee::Anyone,
        }
    }
}
