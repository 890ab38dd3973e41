//! OAuth2 Device Authorization Grant (RFC 8628) against Google's endpoints.
//!
//! Used when no stored token can be reused: the user code and verification
//! URL are logged, and the token endpoint is polled until the grant
//! completes or expires.

use log::{debug, info, warn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::AuthError;
use crate::sanitize::truncate_body;

/// Drive scope limited to files created by this client.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// RFC 8628 device authorization grant type.
const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Minimum TTL for polling the token endpoint (5 seconds).
///
/// Guards against a very short `expires_in` or clock skew making the poll
/// loop give up before its first request.
const MIN_POLL_TTL_SECS: u64 = 5;

/// Response from the device authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,

    /// Code the user types at `verification_uri`.
    pub user_code: String,

    /// Google answers with `verification_url`.
    #[serde(alias = "verification_url")]
    pub verification_uri: String,

    /// Lifetime in seconds of the device_code and user_code.
    pub expires_in: u64,

    /// Minimum polling interval in seconds (default: 5).
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds of the access token.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Only returned on the first grant with `access_type=offline`.
    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

/// Error response from the token endpoint during polling.
#[derive(Debug, Clone, Deserialize)]
struct TokenErrorResponse {
    error: String,

    #[serde(default)]
    error_description: Option<String>,
}

/// Device flow and refresh calls against one pair of endpoints.
pub struct DeviceFlowAuth {
    client: Client,
    device_auth_url: String,
    token_url: String,
    /// Floor for the polling interval; lowered in tests.
    min_interval: Duration,
}

impl DeviceFlowAuth {
    pub fn new(device_auth_url: String, token_url: String) -> Result<Self, AuthError> {
        Ok(Self {
            client: super::client::create_http_client().map_err(|e| {
                AuthError::OAuth2(format!("Failed to create HTTP client: {}", e))
            })?,
            device_auth_url,
            token_url,
            min_interval: Duration::from_secs(1),
        })
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Step 1: request a device code.
    pub async fn request_device_code(
        &self,
        client_id: &str,
    ) -> Result<DeviceCodeResponse, AuthError> {
        info!(
            "Requesting device code from {} for scope: {}",
            self.device_auth_url, DRIVE_FILE_SCOPE
        );

        // access_type=offline is what makes Google hand out a refresh token
        let params = [
            ("client_id", client_id),
            ("scope", DRIVE_FILE_SCOPE),
            ("access_type", "offline"),
        ];

        let response = self
            .client
            .post(&self.device_auth_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::OAuth2(format!("Failed to request device code: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::OAuth2(format!(
                "Device code request failed ({}): {}",
                status,
                truncate_body(&body)
            )));
        }

        let device_code: DeviceCodeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::OAuth2(format!("Failed to parse device code: {}", e)))?;

        info!(
            "To authorize Drive access, visit {} and enter code {}",
            device_code.verification_uri, device_code.user_code
        );

        Ok(device_code)
    }

    /// Step 2: poll for the token until the user authorizes, the code
    /// expires, or the server rejects the grant.
    pub async fn poll_for_token(
        &self,
        device_code: &DeviceCodeResponse,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<TokenResponse, AuthError> {
        let ttl_secs = device_code.expires_in.max(MIN_POLL_TTL_SECS);
        let deadline = std::time::Instant::now() + Duration::from_secs(ttl_secs);

        let max_interval = Duration::from_secs(30);
        let mut interval = Duration::from_secs(device_code.interval).max(self.min_interval);

        info!("Polling for token authorization (expires in {}s)", ttl_secs);

        loop {
            if std::time::Instant::now() > deadline {
                return Err(AuthError::OAuth2(
                    "Device code expired before authorization".to_string(),
                ));
            }

            tokio::time::sleep(interval).await;

            let params = [
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret()),
                ("device_code", device_code.device_code.as_str()),
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
            ];

            let response = self
                .client
                .post(&self.token_url)
                .form(&params)
                .send()
                .await
                .map_err(|e| AuthError::OAuth2(format!("Token request failed: {}", e)))?;

            if response.status().is_success() {
                let token: TokenResponse = response.json().await.map_err(|e| {
                    AuthError::OAuth2(format!("Failed to parse token response: {}", e))
                })?;
                info!("Successfully obtained access token");
                return Ok(token);
            }

            let error: TokenErrorResponse = response.json().await.map_err(|e| {
                AuthError::OAuth2(format!("Failed to parse error response: {}", e))
            })?;

            match error.error.as_str() {
                "authorization_pending" => {
                    debug!("Authorization pending, continuing to poll...");
                }
                "slow_down" => {
                    // RFC 8628 section 3.5: add 5 seconds to the polling interval
                    interval += Duration::from_secs(5);
                    interval = interval.min(max_interval);
                    warn!("Server requested slow down, new interval: {:?}", interval);
                }
                "expired_token" => {
                    return Err(AuthError::OAuth2(
                        "Device code expired before authorization".to_string(),
                    ));
                }
                "access_denied" => {
                    return Err(AuthError::OAuth2(
                        "User denied the authorization request".to_string(),
                    ));
                }
                _ => {
                    return Err(AuthError::OAuth2(format!(
                        "Token request error: {} - {}",
                        error.error,
                        error.error_description.unwrap_or_default()
                    )));
                }
            }
        }
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &SecretString,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<TokenResponse, AuthError> {
        info!("Refreshing access token");

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
            ("refresh_token", refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::OAuth2(format!("Token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::OAuth2(format!(
                "Token refresh failed ({}): {}",
                status,
                truncate_body(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::OAuth2(format!("Failed to parse refresh response: {}", e)))?;

        info!("Successfully refreshed access token");
        Ok(token)
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}
