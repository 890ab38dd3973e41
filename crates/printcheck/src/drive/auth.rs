//! Suite-level authentication: reuse the stored token, refresh it, or fall
//! back to the device flow, then hand out one immutable [`AuthSession`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use secrecy::{ExposeSecret, SecretString};

use super::client::DriveEndpoints;
use super::credentials::{InstalledCredentials, StoredToken};
use super::device_auth::DeviceFlowAuth;
use super::error::AuthError;
use crate::config::DriveConfig;

/// An authenticated handle to the Drive API. Obtained once in suite setup
/// and shared read-only by every case.
pub struct AuthSession {
    access_token: SecretString,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
    scope: Option<String>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl AuthSession {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: None,
            scope: None,
        }
    }

    fn from_stored(token: &StoredToken) -> Self {
        Self {
            access_token: token.access_secret(),
            token_type: token.token_type.clone(),
            expires_at: token.expires_at(),
            scope: token.scope.clone(),
        }
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

/// Produces an [`AuthSession`] from the credentials and token files.
pub struct Authenticator {
    credentials_path: PathBuf,
    token_path: PathBuf,
    client_secret_override: Option<SecretString>,
    device_flow: DeviceFlowAuth,
}

impl Authenticator {
    pub fn new(
        credentials_path: PathBuf,
        token_path: PathBuf,
        endpoints: &DriveEndpoints,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            credentials_path,
            token_path,
            client_secret_override: None,
            device_flow: DeviceFlowAuth::new(
                endpoints.device_code_url.clone(),
                endpoints.token_url.clone(),
            )?,
        })
    }

    pub fn from_config(config: &DriveConfig) -> Result<Self, AuthError> {
        let mut auth = Self::new(
            config.credentials_path.clone(),
            config.token_path.clone(),
            &config.endpoints,
        )?;
        if let Some(source) = &config.client_secret {
            auth.client_secret_override = Some(source.resolve()?);
        }
        Ok(auth)
    }

    /// Lowers the device-flow polling floor; used by tests.
    pub fn with_poll_floor(mut self, floor: Duration) -> Self {
        self.device_flow = self.device_flow.with_min_interval(floor);
        self
    }

    pub async fn authenticate(&self) -> Result<AuthSession, AuthError> {
        let now = Utc::now();
        let stored = match StoredToken::load(&self.token_path) {
            Ok(stored) => stored,
            Err(e @ AuthError::ParseToken { .. }) => {
                warn!("Failed to load stored token, falling back to device flow: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(token) = &stored {
            if !token.is_expired(now) {
                info!("Using stored Drive token");
                return Ok(AuthSession::from_stored(token));
            }
        }

        let credentials = self.credentials()?;

        if let Some(refresh) = stored.as_ref().and_then(StoredToken::refresh_secret) {
            match self
                .device_flow
                .refresh_access_token(&refresh, &credentials.client_id, &credentials.client_secret)
                .await
            {
                Ok(response) => {
                    let previous = stored.and_then(|t| t.refresh_token);
                    let token = StoredToken::from_response(response, previous, Utc::now());
                    token.save(&self.token_path)?;
                    return Ok(AuthSession::from_stored(&token));
                }
                Err(e) => warn!("Stored refresh token rejected, starting device flow: {}", e),
            }
        }

        let device_code = self
            .device_flow
            .request_device_code(&credentials.client_id)
            .await?;
        let response = self
            .device_flow
            .poll_for_token(&device_code, &credentials.client_id, &credentials.client_secret)
            .await?;

        let token = StoredToken::from_response(response, None, Utc::now());
        token.save(&self.token_path)?;
        info!(
            "Drive token stored at {}",
            crate::sanitize::redact_path(&self.token_path)
        );
        Ok(AuthSession::from_stored(&token))
    }

    fn credentials(&self) -> Result<InstalledCredentials, AuthError> {
        let mut credentials = InstalledCredentials::load(&self.credentials_path)?;
        if let Some(secret) = &self.client_secret_override {
            credentials.client_secret = SecretString::from(secret.expose_secret().to_owned());
        }
        Ok(credentials)
    }
}
