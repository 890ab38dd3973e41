//! OAuth client credentials and the persisted token file.

use std::path::Path;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::device_auth::TokenResponse;
use super::error::AuthError;

/// Tokens expiring within this window are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Client id and secret from a Google Cloud "installed app" credentials file.
pub struct InstalledCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for InstalledCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    installed: Option<ClientSection>,
    #[serde(default)]
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

impl InstalledCredentials {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| AuthError::ReadCredentials {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|reason| AuthError::ParseCredentials {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let section = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" section".to_string())?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: SecretString::from(section.client_secret.unwrap_or_default()),
        })
    }
}

/// Token file in the googleapis `token.json` layout.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}

impl StoredToken {
    /// Builds a stored token from a token endpoint response. A refresh
    /// response usually omits the refresh token, so the previous one is kept.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            scope: response.scope,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expiry_date: response
                .expires_in
                .map(|secs| (now + ChronoDuration::seconds(secs as i64)).timestamp_millis()),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date.and_then(DateTime::from_timestamp_millis)
    }

    /// A token without an expiry is assumed valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at - ChronoDuration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    pub fn refresh_secret(&self) -> Option<SecretString> {
        self.refresh_token.clone().map(SecretString::from)
    }

    /// Returns `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::ReadToken {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| AuthError::ParseToken {
                path: path.to_path_buf(),
                source: e,
            })
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let write_err = |e: std::io::Error| AuthError::WriteToken {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(path, json).map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }

        Ok(())
    }

    pub fn access_secret(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }
}
