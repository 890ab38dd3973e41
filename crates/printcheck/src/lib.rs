pub mod config;
pub mod distribution;
pub mod drive;
pub mod error;
pub mod inspection;
pub mod pipeline;
pub mod retrieval;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;

pub use config::{load_config, SuiteConfig, Timeouts};
pub use distribution::{CleanupReport, Distributor, ShareLink};
pub use drive::{AuthSession, Authenticator, DriveClient, DriveEndpoints};
pub use error::{ConfigError, PrintCheckError, Result};
pub use inspection::{can_print, PdfPermissionValidator, PermissionFlag, PermissionSet};
pub use pipeline::{run_configured_suite, CaseOutcome, Fixture, SuiteReport, SuiteRunner};
pub use retrieval::{DownloadedArtifact, Retriever, UiLabels};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError, SecretSource};
pub use telemetry::{init_logging, LogFormat};
