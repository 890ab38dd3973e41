//! Browser seam for the retrieval flow.
//!
//! The flow only needs a handful of page operations, so they are expressed
//! as traits: `chrome` implements them over the DevTools protocol and tests
//! implement them with a scripted fake.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::error::Result;
use super::locator::Locator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    /// Opens links in a new tab.
    Middle,
}

/// Ids of the pages open in a context at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot(HashSet<String>);

impl PageSnapshot {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A finished download, still in the browser's staging location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedDownload {
    pub suggested_filename: String,
    pub path: PathBuf,
}

#[async_trait]
pub trait ViewerPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Waits until the page has finished loading and stopped fetching.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// Whether a matching element is currently rendered and visible. Never
    /// waits.
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    async fn click(&self, locator: &Locator, button: MouseButton) -> Result<()>;

    /// Replaces the value of an input.
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Presses a named key (e.g. `Enter`) with the element focused.
    async fn press(&self, locator: &Locator, key: &str) -> Result<()>;

    /// `None` when the element or the attribute is absent.
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;
}

/// An isolated browser session (own cookies, own downloads).
#[async_trait]
pub trait BrowserContext: Send + Sync {
    type Page: ViewerPage;

    async fn new_page(&self) -> Result<Self::Page>;

    async fn snapshot(&self) -> Result<PageSnapshot>;

    /// First page opened after `since` was taken.
    async fn wait_for_new_page(&self, since: &PageSnapshot, timeout: Duration)
        -> Result<Self::Page>;

    /// Next completed download in this context.
    async fn wait_for_download(&self, timeout: Duration) -> Result<CapturedDownload>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait BrowserHost: Send + Sync {
    type Context: BrowserContext;

    async fn new_context(&self) -> Result<Self::Context>;
}
