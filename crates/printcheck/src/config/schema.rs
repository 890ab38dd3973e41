use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::drive::DriveEndpoints;
use crate::retrieval::UiLabels;
use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteConfig {
    pub version: String,
    pub drive: DriveConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub ui: UiLabels,
    #[serde(default)]
    pub fixtures: Vec<FixtureConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfig {
    /// Shared folder every fixture is uploaded into.
    pub folder_id: String,
    /// Public URL of that folder. Derived from `folder_id` when absent.
    #[serde(default)]
    pub folder_url: Option<String>,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    /// Overrides the client secret from the credentials file.
    #[serde(default)]
    pub client_secret: Option<SecretSource>,
    #[serde(default)]
    pub endpoints: DriveEndpoints,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

fn default_true() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    800
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            download_dir: default_download_dir(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

/// Bounds for every suspension point of a case, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
    /// Waiting for the file entry to show up in the folder listing.
    pub locate_ms: u64,
    /// Probe for the viewer's password prompt.
    pub password_probe_ms: u64,
    /// Pause after pressing Enter in the password field.
    pub settle_ms: u64,
    /// Waiting for the password submit control to become enabled.
    pub submit_enabled_ms: u64,
    /// Waiting for the viewer to render document content.
    pub render_ms: u64,
    /// Waiting for the download control after unlocking.
    pub download_control_ms: u64,
    /// Waiting for the localized download control on unprotected files.
    pub localized_download_control_ms: u64,
    /// Probe for the "Download anyway" interstitial.
    pub interstitial_ms: u64,
    /// Waiting for a new tab to appear.
    pub new_page_ms: u64,
    /// Waiting for a page to stop loading.
    pub network_idle_ms: u64,
    /// Waiting for the download to complete.
    pub download_ms: u64,
    /// Wall clock for one whole case.
    pub case_ms: u64,
    /// Poll interval for all visibility and attribute waits.
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            locate_ms: 60_000,
            password_probe_ms: 3_000,
            settle_ms: 500,
            submit_enabled_ms: 5_000,
            render_ms: 15_000,
            download_control_ms: 10_000,
            localized_download_control_ms: 15_000,
            interstitial_ms: 5_000,
            new_page_ms: 30_000,
            network_idle_ms: 30_000,
            download_ms: 60_000,
            case_ms: 120_000,
            poll_interval_ms: 100,
        }
    }
}

impl Timeouts {
    pub fn locate(&self) -> Duration {
        Duration::from_millis(self.locate_ms)
    }

    pub fn password_probe(&self) -> Duration {
        Duration::from_millis(self.password_probe_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn submit_enabled(&self) -> Duration {
        Duration::from_millis(self.submit_enabled_ms)
    }

    pub fn render(&self) -> Duration {
        Duration::from_millis(self.render_ms)
    }

    pub fn download_control(&self) -> Duration {
        Duration::from_millis(self.download_control_ms)
    }

    pub fn localized_download_control(&self) -> Duration {
        Duration::from_millis(self.localized_download_control_ms)
    }

    pub fn interstitial(&self) -> Duration {
        Duration::from_millis(self.interstitial_ms)
    }

    pub fn new_page(&self) -> Duration {
        Duration::from_millis(self.new_page_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn download(&self) -> Duration {
        Duration::from_millis(self.download_ms)
    }

    pub fn case(&self) -> Duration {
        Duration::from_millis(self.case_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Named values, for validation messages.
    pub(crate) fn entries(&self) -> [(&'static str, u64); 13] {
        [
            ("locateMs", self.locate_ms),
            ("passwordProbeMs", self.password_probe_ms),
            ("settleMs", self.settle_ms),
            ("submitEnabledMs", self.submit_enabled_ms),
            ("renderMs", self.render_ms),
            ("downloadControlMs", self.download_control_ms),
            ("localizedDownloadControlMs", self.localized_download_control_ms),
            ("interstitialMs", self.interstitial_ms),
            ("newPageMs", self.new_page_ms),
            ("networkIdleMs", self.network_idle_ms),
            ("downloadMs", self.download_ms),
            ("caseMs", self.case_ms),
            ("pollIntervalMs", self.poll_interval_ms),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureConfig {
    /// Name as it appears in the Drive folder; must equal the file name of `path`.
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub password: Option<SecretSource>,
    pub expect_printable: bool,
}
