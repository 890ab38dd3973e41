//! The download state machine: navigate, locate, open, unlock, download,
//! persist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

use super::driver::{BrowserContext, CapturedDownload, MouseButton, ViewerPage};
use super::error::{Result, RetrievalError};
use super::labels::UiLabels;
use super::locator::Locator;
use crate::config::Timeouts;

/// A PDF fetched through the provider's own download flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub suggested_filename: String,
}

pub struct Retriever {
    labels: UiLabels,
    timeouts: Timeouts,
    download_dir: PathBuf,
}

impl Retriever {
    pub fn new(labels: UiLabels, timeouts: Timeouts, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels,
            timeouts,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Finds `file_name` in the folder at `share_url`, downloads it and
    /// stores it in the download directory.
    pub async fn download<C: BrowserContext>(
        &self,
        context: &C,
        file_name: &str,
        share_url: &str,
        password: Option<&SecretString>,
    ) -> Result<DownloadedArtifact> {
        let t = &self.timeouts;

        info!("Navigating to shared folder: {}", share_url);
        let folder = context.new_page().await?;
        folder.goto(share_url).await?;
        folder.wait_for_network_idle(t.network_idle()).await?;

        let entry = self.labels.file_entry(file_name);
        if !self.wait_visible(&folder, &entry, t.locate()).await? {
            return Err(RetrievalError::FileNotFound {
                name: file_name.to_string(),
                waited: t.locate(),
            });
        }

        let before = context.snapshot().await?;
        folder.click(&entry, MouseButton::Middle).await?;
        let viewer = context.wait_for_new_page(&before, t.new_page()).await?;
        viewer.wait_for_network_idle(t.network_idle()).await?;
        info!("Opened '{}' in a new tab", file_name);

        let captured = if self
            .wait_visible(&viewer, &self.labels.password_input, t.password_probe())
            .await?
        {
            let password = password.ok_or_else(|| RetrievalError::PasswordRequired {
                name: file_name.to_string(),
            })?;
            self.download_protected(context, &viewer, password).await?
        } else {
            self.download_open(context, &viewer).await?
        };

        self.persist(captured).await
    }

    async fn download_protected<C: BrowserContext>(
        &self,
        context: &C,
        viewer: &C::Page,
        password: &SecretString,
    ) -> Result<CapturedDownload> {
        let t = &self.timeouts;
        let input = &self.labels.password_input;
        let submit = &self.labels.password_submit;

        info!("Password prompt detected, unlocking");
        viewer.fill(input, password.expose_secret()).await?;
        viewer.press(input, "Enter").await?;
        tokio::time::sleep(t.settle()).await;

        if !self
            .wait_attribute(viewer, submit, "aria-disabled", "false", t.submit_enabled())
            .await?
        {
            return Err(RetrievalError::timeout(
                "password submit control to become enabled",
                t.submit_enabled(),
            ));
        }
        viewer.click(submit, MouseButton::Left).await?;
        viewer.wait_for_network_idle(t.network_idle()).await?;

        self.ensure_rendered(viewer).await?;

        let control = &self.labels.protected_download;
        if !self.wait_visible(viewer, control, t.download_control()).await? {
            return Err(RetrievalError::timeout(
                format!("download control ({})", control.describe()),
                t.download_control(),
            ));
        }

        let before = context.snapshot().await?;
        viewer.click(control, MouseButton::Left).await?;
        debug!("Download control clicked");

        let tab = context.wait_for_new_page(&before, t.new_page()).await?;
        tab.wait_for_network_idle(t.network_idle()).await?;

        let interstitial = &self.labels.download_anyway;
        if self.wait_visible(&tab, interstitial, t.interstitial()).await? {
            info!("Confirming 'Download anyway' interstitial");
            tab.click(interstitial, MouseButton::Left).await?;
        }

        context.wait_for_download(t.download()).await
    }

    async fn download_open<C: BrowserContext>(
        &self,
        context: &C,
        viewer: &C::Page,
    ) -> Result<CapturedDownload> {
        let t = &self.timeouts;

        self.ensure_rendered(viewer).await?;

        let control = self.labels.download_control();
        if !self
            .wait_visible(viewer, &control, t.localized_download_control())
            .await?
        {
            return Err(RetrievalError::timeout(
                format!("download control ({})", control.describe()),
                t.localized_download_control(),
            ));
        }

        viewer.click(&control, MouseButton::Left).await?;
        debug!("Download control clicked");

        context.wait_for_download(t.download()).await
    }

    async fn ensure_rendered<P: ViewerPage>(&self, page: &P) -> Result<()> {
        let waited = self.timeouts.render();
        if self
            .wait_visible(page, &self.labels.viewer_content, waited)
            .await?
        {
            info!("PDF loaded successfully");
            Ok(())
        } else {
            Err(RetrievalError::Render { waited })
        }
    }

    /// Polls until the element is visible. Returns `false` on timeout.
    async fn wait_visible<P: ViewerPage>(
        &self,
        page: &P,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if page.is_visible(locator).await? {
                return Ok(true);
            }
            if !self.pause_until(deadline).await {
                return Ok(false);
            }
        }
    }

    async fn wait_attribute<P: ViewerPage>(
        &self,
        page: &P,
        locator: &Locator,
        name: &str,
        expected: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if page.attribute(locator, name).await?.as_deref() == Some(expected) {
                return Ok(true);
            }
            if !self.pause_until(deadline).await {
                return Ok(false);
            }
        }
    }

    /// Sleeps one poll interval, capped at `deadline`. `false` once the
    /// deadline has passed.
    async fn pause_until(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let step = self.timeouts.poll_interval().min(deadline - now);
        tokio::time::sleep(step).await;
        true
    }

    async fn persist(&self, captured: CapturedDownload) -> Result<DownloadedArtifact> {
        let file_name = Path::new(&captured.suggested_filename)
            .file_name()
            .map(|n| n.to_os_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                RetrievalError::Download(format!(
                    "unusable suggested filename '{}'",
                    captured.suggested_filename
                ))
            })?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| RetrievalError::Io {
                path: self.download_dir.clone(),
                source: e,
            })?;

        let target = self.download_dir.join(file_name);
        move_file(&captured.path, &target).await?;

        info!("Download complete: {}", target.display());
        Ok(DownloadedArtifact {
            path: target,
            suggested_filename: captured.suggested_filename,
        })
    }
}

/// Rename, falling back to copy + delete across filesystems.
async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if tokio::fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }

    let io_err = |e| RetrievalError::Io {
        path: dst.to_path_buf(),
        source: e,
    };
    tokio::fs::copy(src, dst).await.map_err(io_err)?;
    tokio::fs::remove_file(src).await.map_err(io_err)?;
    Ok(())
}
