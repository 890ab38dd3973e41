//! A scripted stand-in for Chrome showing a Drive folder.
//!
//! Pages react to the locators in [`UiLabels`] the way the real provider UI
//! does: the folder lists its files by name, the viewer asks for a password
//! when the file has one, and download controls drop the file bytes into a
//! staging directory and report them as a finished download.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use printcheck::retrieval::{
    BrowserContext, BrowserHost, CapturedDownload, Locator, MouseButton, PageSnapshot,
    RetrievalError, UiLabels, ViewerPage,
};

type Result<T> = std::result::Result<T, RetrievalError>;

const POLL: Duration = Duration::from_millis(5);

/// A file as the fake provider serves it.
#[derive(Debug, Clone, Default)]
pub struct FakeFile {
    pub bytes: Vec<u8>,
    pub password: Option<String>,
    /// Show the "Download anyway" confirmation before downloading.
    pub interstitial: bool,
    /// The viewer never renders content.
    pub broken_viewer: bool,
    /// Download controls do nothing.
    pub no_download: bool,
}

impl FakeFile {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    pub fn protected(bytes: Vec<u8>, password: &str) -> Self {
        Self {
            bytes,
            password: Some(password.to_string()),
            ..Self::default()
        }
    }

    pub fn with_interstitial(mut self) -> Self {
        self.interstitial = true;
        self
    }

    pub fn with_broken_viewer(mut self) -> Self {
        self.broken_viewer = true;
        self
    }

    pub fn without_download(mut self) -> Self {
        self.no_download = true;
        self
    }
}

struct DriveState {
    labels: UiLabels,
    folder_url: String,
    staging: PathBuf,
    files: Mutex<HashMap<String, FakeFile>>,
    actions: Mutex<Vec<String>>,
    opened_contexts: AtomicUsize,
    closed_contexts: AtomicUsize,
    next_id: AtomicUsize,
}

impl DriveState {
    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn file(&self, name: &str) -> Option<FakeFile> {
        self.files.lock().unwrap().get(name).cloned()
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

/// The fake browser. Cloning shares the same folder and action log.
#[derive(Clone)]
pub struct FakeDrive {
    state: Arc<DriveState>,
}

impl FakeDrive {
    pub fn new(labels: UiLabels, folder_url: &str, staging: &Path) -> Self {
        std::fs::create_dir_all(staging).expect("Failed to create staging dir");
        Self {
            state: Arc::new(DriveState {
                labels,
                folder_url: folder_url.to_string(),
                staging: staging.to_path_buf(),
                files: Mutex::new(HashMap::new()),
                actions: Mutex::new(Vec::new()),
                opened_contexts: AtomicUsize::new(0),
                closed_contexts: AtomicUsize::new(0),
                next_id: AtomicUsize::new(0),
            }),
        }
    }

    pub fn add_file(&self, name: &str, file: FakeFile) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), file);
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.actions.lock().unwrap().clone()
    }

    pub fn opened_contexts(&self) -> usize {
        self.state.opened_contexts.load(Ordering::SeqCst)
    }

    pub fn closed_contexts(&self) -> usize {
        self.state.closed_contexts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserHost for FakeDrive {
    type Context = FakeContext;

    async fn new_context(&self) -> Result<FakeContext> {
        self.state.opened_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(FakeContext {
            drive: self.state.clone(),
            inner: Arc::new(Mutex::new(ContextState::default())),
        })
    }
}

#[derive(Default)]
struct ContextState {
    pages: Vec<(String, Arc<Mutex<PageKind>>)>,
    downloads: VecDeque<CapturedDownload>,
}

#[derive(Debug, Clone)]
enum PageKind {
    Blank,
    Folder,
    Viewer {
        file: String,
        typed: String,
        unlocked: bool,
    },
    DownloadTab {
        file: String,
        confirmed: bool,
    },
}

pub struct FakeContext {
    drive: Arc<DriveState>,
    inner: Arc<Mutex<ContextState>>,
}

impl FakeContext {
    fn page(&self, id: String, kind: Arc<Mutex<PageKind>>) -> FakePage {
        FakePage {
            id,
            kind,
            drive: self.drive.clone(),
            context: self.inner.clone(),
        }
    }
}

#[async_trait]
impl BrowserContext for FakeContext {
    type Page = FakePage;

    async fn new_page(&self) -> Result<FakePage> {
        let id = format!("page-{}", self.drive.next_id());
        let kind = Arc::new(Mutex::new(PageKind::Blank));
        self.inner
            .lock()
            .unwrap()
            .pages
            .push((id.clone(), kind.clone()));
        Ok(self.page(id, kind))
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        let inner = self.inner.lock().unwrap();
        Ok(PageSnapshot::new(inner.pages.iter().map(|(id, _)| id.clone())))
    }

    async fn wait_for_new_page(&self, since: &PageSnapshot, timeout: Duration) -> Result<FakePage> {
        let deadline = Instant::now() + timeout;
        loop {
            let found = self
                .inner
                .lock()
                .unwrap()
                .pages
                .iter()
                .find(|(id, _)| !since.contains(id))
                .cloned();
            if let Some((id, kind)) = found {
                return Ok(self.page(id, kind));
            }
            if Instant::now() >= deadline {
                return Err(RetrievalError::Timeout {
                    step: "new page".to_string(),
                    limit: timeout,
                });
            }
            tokio::time::sleep(POLL).await;
        }
    }

    async fn wait_for_download(&self, timeout: Duration) -> Result<CapturedDownload> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(download) = self.inner.lock().unwrap().downloads.pop_front() {
                return Ok(download);
            }
            if Instant::now() >= deadline {
                return Err(RetrievalError::Timeout {
                    step: "download".to_string(),
                    limit: timeout,
                });
            }
            tokio::time::sleep(POLL).await;
        }
    }

    async fn close(&self) -> Result<()> {
        self.drive.closed_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    id: String,
    kind: Arc<Mutex<PageKind>>,
    drive: Arc<DriveState>,
    context: Arc<Mutex<ContextState>>,
}

impl FakePage {
    fn kind(&self) -> PageKind {
        self.kind.lock().unwrap().clone()
    }

    fn set_kind(&self, kind: PageKind) {
        *self.kind.lock().unwrap() = kind;
    }

    fn open_page(&self, kind: PageKind) {
        let id = format!("page-{}", self.drive.next_id());
        self.context
            .lock()
            .unwrap()
            .pages
            .push((id, Arc::new(Mutex::new(kind))));
    }

    fn start_download(&self, name: &str, file: &FakeFile) {
        if file.no_download {
            return;
        }
        let staged = self
            .drive
            .staging
            .join(format!("guid-{}", self.drive.next_id()));
        std::fs::write(&staged, &file.bytes).expect("Failed to stage download");
        self.context
            .lock()
            .unwrap()
            .downloads
            .push_back(CapturedDownload {
                suggested_filename: name.to_string(),
                path: staged,
            });
    }

    fn no_match(&self, locator: &Locator) -> RetrievalError {
        RetrievalError::Browser(format!(
            "no element matches {} on {}",
            locator.describe(),
            self.id
        ))
    }
}

#[async_trait]
impl ViewerPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.drive.record(format!("goto {}", url));
        if url == self.drive.folder_url {
            self.set_kind(PageKind::Folder);
        } else {
            self.set_kind(PageKind::Blank);
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let labels = &self.drive.labels;
        let visible = match self.kind() {
            PageKind::Blank => false,
            PageKind::Folder => match locator {
                Locator::Text(name) => self.drive.file(name).is_some(),
                _ => false,
            },
            PageKind::Viewer { file, unlocked, .. } => {
                let Some(file) = self.drive.file(&file) else {
                    return Ok(false);
                };
                let locked = file.password.is_some() && !unlocked;
                if *locator == labels.password_input {
                    locked
                } else if *locator == labels.viewer_content {
                    !locked && !file.broken_viewer
                } else if *locator == labels.protected_download {
                    !locked && file.password.is_some()
                } else if *locator == labels.download_control() {
                    !locked && file.password.is_none()
                } else {
                    false
                }
            }
            PageKind::DownloadTab { file, confirmed } => {
                *locator == labels.download_anyway
                    && !confirmed
                    && self.drive.file(&file).is_some_and(|f| f.interstitial)
            }
        };
        Ok(visible)
    }

    async fn click(&self, locator: &Locator, button: MouseButton) -> Result<()> {
        self.drive
            .record(format!("click {:?} {}", button, locator.describe()));
        let labels = &self.drive.labels;

        match self.kind() {
            PageKind::Folder => match (locator, button) {
                (Locator::Text(name), MouseButton::Middle) if self.drive.file(name).is_some() => {
                    self.open_page(PageKind::Viewer {
                        file: name.clone(),
                        typed: String::new(),
                        unlocked: false,
                    });
                    Ok(())
                }
                _ => Err(self.no_match(locator)),
            },
            PageKind::Viewer {
                file: name,
                typed,
                unlocked,
            } => {
                let file = self.drive.file(&name).ok_or_else(|| self.no_match(locator))?;
                let locked = file.password.is_some() && !unlocked;

                if locked && *locator == labels.password_submit {
                    if file.password.as_deref() == Some(typed.as_str()) {
                        self.set_kind(PageKind::Viewer {
                            file: name,
                            typed,
                            unlocked: true,
                        });
                    }
                    Ok(())
                } else if !locked && file.password.is_some() && *locator == labels.protected_download {
                    self.open_page(PageKind::DownloadTab {
                        file: name.clone(),
                        confirmed: false,
                    });
                    if !file.interstitial {
                        self.start_download(&name, &file);
                    }
                    Ok(())
                } else if !locked
                    && file.password.is_none()
                    && *locator == labels.download_control()
                {
                    self.start_download(&name, &file);
                    Ok(())
                } else {
                    Err(self.no_match(locator))
                }
            }
            PageKind::DownloadTab { file: name, confirmed } => {
                if *locator == labels.download_anyway && !confirmed {
                    let file = self.drive.file(&name).ok_or_else(|| self.no_match(locator))?;
                    self.set_kind(PageKind::DownloadTab {
                        file: name.clone(),
                        confirmed: true,
                    });
                    self.start_download(&name, &file);
                    Ok(())
                } else {
                    Err(self.no_match(locator))
                }
            }
            PageKind::Blank => Err(self.no_match(locator)),
        }
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        self.drive.record(format!("fill {}", locator.describe()));
        match self.kind() {
            PageKind::Viewer { file, unlocked, .. } if *locator == self.drive.labels.password_input => {
                self.set_kind(PageKind::Viewer {
                    file,
                    typed: value.to_string(),
                    unlocked,
                });
                Ok(())
            }
            _ => Err(self.no_match(locator)),
        }
    }

    async fn press(&self, locator: &Locator, key: &str) -> Result<()> {
        self.drive
            .record(format!("press {} {}", key, locator.describe()));
        Ok(())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        match self.kind() {
            PageKind::Viewer {
                typed, unlocked, ..
            } if !unlocked && *locator == self.drive.labels.password_submit => {
                if name == "aria-disabled" {
                    Ok(Some(typed.is_empty().to_string()))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }
}
