//! Retrieval stage: fetch a shared PDF the way a user would, through the
//! provider's web viewer.

pub mod chrome;
pub mod driver;
pub mod error;
pub mod flow;
pub mod labels;
pub mod locator;

pub use chrome::{ChromeBrowser, ChromeContext, ChromePage};
pub use driver::{
    BrowserContext, BrowserHost, CapturedDownload, MouseButton, PageSnapshot, ViewerPage,
};
pub use error::RetrievalError;
pub use flow::{DownloadedArtifact, Retriever};
pub use labels::{LocalizedLabel, UiLabels};
pub use locator::Locator;
