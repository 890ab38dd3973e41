//! [`BrowserHost`] over Chrome's DevTools protocol.
//!
//! Each context is a CDP browser context with its own download directory.
//! Downloads are captured with `Browser.setDownloadBehavior(allowAndName)`,
//! so Chrome stores every file under its GUID and reports progress through
//! browser-level events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, CloseParams, DownloadProgressState, EventDownloadProgress,
    EventDownloadWillBegin, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton as CdpMouseButton,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams, GetTargetsParams,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::{Element, Page};
use futures_util::StreamExt;
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::driver::{
    BrowserContext, BrowserHost, CapturedDownload, MouseButton, PageSnapshot, ViewerPage,
};
use super::error::{Result, RetrievalError};
use super::locator::Locator;
use crate::config::BrowserConfig;

/// Marker attribute used to hand an element found by script to CDP.
const TARGET_ATTRIBUTE: &str = "data-printcheck-target";

/// A page counts as idle once its resource count stops changing for this long.
const NETWORK_QUIET: Duration = Duration::from_millis(500);

const PAGE_POLL: Duration = Duration::from_millis(100);

fn cdp_err(err: chromiumoxide::error::CdpError) -> RetrievalError {
    RetrievalError::Browser(err.to_string())
}

/// A running Chrome process and the task pumping its CDP connection.
pub struct ChromeBrowser {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

impl ChromeBrowser {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder =
            CdpBrowserConfig::builder().window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        let cdp_config = builder.build().map_err(RetrievalError::Browser)?;

        let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(cdp_err)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler,
        })
    }

    pub async fn close(self) -> Result<()> {
        if let Err(e) = self.browser.execute(CloseParams::default()).await {
            warn!("Browser did not close cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl BrowserHost for ChromeBrowser {
    type Context = ChromeContext;

    async fn new_context(&self) -> Result<ChromeContext> {
        let id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(cdp_err)?
            .result
            .browser_context_id;

        let staging = std::env::temp_dir().join(format!(
            "printcheck-downloads-{}",
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| RetrievalError::Io {
                path: staging.clone(),
                source: e,
            })?;

        // Listeners first, so no event between enabling and subscribing is lost.
        let will_begin = self
            .browser
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(cdp_err)?;
        let progress = self
            .browser
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(cdp_err)?;

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .browser_context_id(id.clone())
            .download_path(staging.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(RetrievalError::Browser)?;
        self.browser.execute(behavior).await.map_err(cdp_err)?;

        Ok(ChromeContext {
            browser: Arc::clone(&self.browser),
            id,
            staging,
            downloads: Mutex::new(DownloadEvents {
                will_begin: Box::pin(will_begin),
                progress: Box::pin(progress),
                names: HashMap::new(),
            }),
        })
    }
}

struct DownloadEvents {
    will_begin: Pin<Box<EventStream<EventDownloadWillBegin>>>,
    progress: Pin<Box<EventStream<EventDownloadProgress>>>,
    /// Suggested filename by download GUID.
    names: HashMap<String, String>,
}

pub struct ChromeContext {
    browser: Arc<Browser>,
    id: BrowserContextId,
    staging: PathBuf,
    downloads: Mutex<DownloadEvents>,
}

impl ChromeContext {
    async fn page_targets(&self) -> Result<Vec<String>> {
        let targets = self
            .browser
            .execute(GetTargetsParams::default())
            .await
            .map_err(cdp_err)?
            .result
            .target_infos;

        Ok(targets
            .into_iter()
            .filter(|t| t.r#type == "page" && t.browser_context_id.as_ref() == Some(&self.id))
            .map(|t| t.target_id.inner().clone())
            .collect())
    }

    async fn page_by_target(&self, target_id: &str) -> Result<Option<ChromePage>> {
        let pages = self.browser.pages().await.map_err(cdp_err)?;
        Ok(pages
            .into_iter()
            .find(|p| p.target_id().inner() == target_id)
            .map(ChromePage::new))
    }

    async fn next_download(&self) -> Result<CapturedDownload> {
        let mut events = self.downloads.lock().await;
        let DownloadEvents {
            will_begin,
            progress,
            names,
        } = &mut *events;

        loop {
            tokio::select! {
                biased;
                Some(begin) = will_begin.next() => {
                    names.insert(begin.guid.clone(), begin.suggested_filename.clone());
                }
                Some(update) = progress.next() => {
                    match update.state {
                        DownloadProgressState::Completed => {}
                        DownloadProgressState::Canceled => {
                            debug!("Download {} canceled", update.guid);
                            names.remove(&update.guid);
                            continue;
                        }
                        _ => continue,
                    }
                    // Events are browser-wide; only files in our staging dir are ours.
                    let staged = self.staging.join(&update.guid);
                    if !staged.is_file() {
                        continue;
                    }
                    let suggested_filename = names
                        .remove(&update.guid)
                        .unwrap_or_else(|| update.guid.clone());
                    return Ok(CapturedDownload {
                        suggested_filename,
                        path: staged,
                    });
                }
                else => {
                    return Err(RetrievalError::Download(
                        "browser stopped reporting download events".to_string(),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl BrowserContext for ChromeContext {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.id.clone())
            .build()
            .map_err(RetrievalError::Browser)?;
        let page = self.browser.new_page(params).await.map_err(cdp_err)?;
        Ok(ChromePage::new(page))
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(PageSnapshot::new(self.page_targets().await?))
    }

    async fn wait_for_new_page(
        &self,
        since: &PageSnapshot,
        timeout: Duration,
    ) -> Result<ChromePage> {
        let deadline = Instant::now() + timeout;
        loop {
            for target_id in self.page_targets().await? {
                if since.contains(&target_id) {
                    continue;
                }
                // The target can be listed before the handler has attached to it.
                if let Some(page) = self.page_by_target(&target_id).await? {
                    return Ok(page);
                }
            }
            if Instant::now() >= deadline {
                return Err(RetrievalError::timeout("a new tab to open", timeout));
            }
            tokio::time::sleep(PAGE_POLL).await;
        }
    }

    async fn wait_for_download(&self, timeout: Duration) -> Result<CapturedDownload> {
        tokio::time::timeout(timeout, self.next_download())
            .await
            .map_err(|_| RetrievalError::timeout("the download to complete", timeout))?
    }

    async fn close(&self) -> Result<()> {
        self.browser
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await
            .map_err(cdp_err)?;
        if let Err(e) = tokio::fs::remove_dir_all(&self.staging).await {
            debug!("Could not remove staging dir {}: {}", self.staging.display(), e);
        }
        Ok(())
    }
}

pub struct ChromePage {
    page: Page,
}

/// Wrapped so a missing attribute arrives as `null` inside an object
/// rather than as a bare `null` result.
#[derive(Deserialize)]
struct AttributeValue {
    value: Option<String>,
}

#[derive(Deserialize)]
struct LoadState {
    ready: String,
    resources: u64,
}

impl ChromePage {
    fn new(page: Page) -> Self {
        Self { page }
    }

    /// Runs the element resolver. When an element is found it is tagged
    /// with [`TARGET_ATTRIBUTE`] so CDP can select it.
    async fn resolve(&self, locator: &Locator, require_visible: bool) -> Result<Option<String>> {
        let marker = uuid::Uuid::new_v4().simple().to_string();
        let script = resolver_script(locator, require_visible, Some(&marker), None)?;
        let found: bool = self
            .page
            .evaluate(script)
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(|e| RetrievalError::Browser(e.to_string()))?;
        Ok(found.then_some(marker))
    }

    async fn element(&self, locator: &Locator) -> Result<Element> {
        let marker = self.resolve(locator, true).await?.ok_or_else(|| {
            RetrievalError::Browser(format!("no visible element for {}", locator.describe()))
        })?;
        self.page
            .find_element(format!("[{}=\"{}\"]", TARGET_ATTRIBUTE, marker))
            .await
            .map_err(cdp_err)
    }

    async fn middle_click(&self, element: &Element) -> Result<()> {
        element.scroll_into_view().await.map_err(cdp_err)?;
        let point = element.clickable_point().await.map_err(cdp_err)?;

        for kind in [
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let event = DispatchMouseEventParams::builder()
                .r#type(kind)
                .x(point.x)
                .y(point.y)
                .button(CdpMouseButton::Middle)
                .click_count(1)
                .build()
                .map_err(RetrievalError::Browser)?;
            self.page.execute(event).await.map_err(cdp_err)?;
        }
        Ok(())
    }

    async fn load_state(&self) -> Result<LoadState> {
        self.page
            .evaluate(
                "({ ready: document.readyState, resources: performance.getEntriesByType('resource').length })",
            )
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(|e| RetrievalError::Browser(e.to_string()))
    }
}

#[async_trait]
impl ViewerPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut last: Option<(u64, Instant)> = None;
        loop {
            let state = self.load_state().await?;
            let now = Instant::now();
            if state.ready == "complete" {
                match last {
                    Some((count, since)) if count == state.resources => {
                        if now.duration_since(since) >= NETWORK_QUIET {
                            return Ok(());
                        }
                    }
                    _ => last = Some((state.resources, now)),
                }
            } else {
                last = None;
            }
            if now >= deadline {
                return Err(RetrievalError::timeout("network idle", timeout));
            }
            tokio::time::sleep(PAGE_POLL).await;
        }
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let script = resolver_script(locator, true, None, None)?;
        self.page
            .evaluate(script)
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(|e| RetrievalError::Browser(e.to_string()))
    }

    async fn click(&self, locator: &Locator, button: MouseButton) -> Result<()> {
        let element = self.element(locator).await?;
        match button {
            MouseButton::Left => {
                element.click().await.map_err(cdp_err)?;
            }
            MouseButton::Middle => self.middle_click(&element).await?,
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.element(locator).await?;
        element.focus().await.map_err(cdp_err)?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(cdp_err)?;
        element.type_str(value).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: &str) -> Result<()> {
        let element = self.element(locator).await?;
        element.focus().await.map_err(cdp_err)?;
        element.press_key(key).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let script = resolver_script(locator, false, None, Some(name))?;
        let read: AttributeValue = self
            .page
            .evaluate(script)
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(|e| RetrievalError::Browser(e.to_string()))?;
        Ok(read.value)
    }
}

/// Builds the in-page element lookup.
///
/// Returns `true`/`false` (found or not), or `{ value }` holding the
/// attribute when `attribute` is given. Text locators match the innermost element whose
/// visible text equals (or contains) the value.
fn resolver_script(
    locator: &Locator,
    require_visible: bool,
    marker: Option<&str>,
    attribute: Option<&str>,
) -> Result<String> {
    let kind = to_js(locator.kind())?;
    let value = to_js(locator.value())?;
    let marker = to_js(&marker)?;
    let attribute = to_js(&attribute)?;

    Ok(format!(
        r#"(() => {{
  const kind = {kind};
  const value = {value};
  const marker = {marker};
  const attribute = {attribute};
  const requireVisible = {require_visible};
  const visible = (el) => {{
    const style = window.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  }};
  const text = (el) => (el.innerText || '').trim();
  const matchesText = (el) => kind === 'text'
    ? text(el) === value
    : text(el).toLowerCase().includes(value.toLowerCase());
  let candidates;
  if (kind === 'css') {{
    candidates = Array.from(document.querySelectorAll(value));
  }} else {{
    candidates = Array.from(document.querySelectorAll('body *')).filter((el) =>
      matchesText(el) && !Array.from(el.children).some(matchesText));
  }}
  const found = candidates.find((el) => !requireVisible || visible(el));
  if (attribute !== null) {{
    return {{ value: found ? found.getAttribute(attribute) : null }};
  }}
  if (!found) return false;
  if (marker !== null) {{
    document.querySelectorAll('[{target}]').forEach((el) => el.removeAttribute('{target}'));
    found.setAttribute('{target}', marker);
  }}
  return true;
}})()"#,
        kind = kind,
        value = value,
        marker = marker,
        attribute = attribute,
        require_visible = require_visible,
        target = TARGET_ATTRIBUTE,
    ))
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| RetrievalError::Browser(e.to_string()))
}
