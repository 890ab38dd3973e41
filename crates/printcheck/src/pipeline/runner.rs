use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use secrecy::SecretString;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::config::SuiteConfig;
use crate::distribution::{CleanupReport, Distributor};
use crate::drive::{AuthSession, Authenticator, CleanupError, DriveClient};
use crate::error::{PrintCheckError, Result};
use crate::inspection::{PdfPermissionValidator, PermissionSet};
use crate::retrieval::{BrowserContext, BrowserHost, ChromeBrowser, Retriever};

use super::fixture::Fixture;
use super::report::{CaseOutcome, CaseReport, SuiteReport};

/// Runs fixtures through distribution, retrieval and inspection.
///
/// Cases share the Drive session and the browser; each case gets its own
/// browser context and its own file in the folder.
pub struct SuiteRunner<H: BrowserHost> {
    session: Arc<AuthSession>,
    distributor: Distributor,
    host: H,
    retriever: Retriever,
    validator: PdfPermissionValidator,
    case_timeout: Duration,
}

impl<H: BrowserHost> SuiteRunner<H> {
    pub fn new(
        session: Arc<AuthSession>,
        distributor: Distributor,
        host: H,
        retriever: Retriever,
        case_timeout: Duration,
    ) -> Self {
        Self {
            session,
            distributor,
            host,
            retriever,
            validator: PdfPermissionValidator::new(),
            case_timeout,
        }
    }

    /// Builds the Drive and retrieval sides from a suite config.
    pub fn from_config(config: &SuiteConfig, session: Arc<AuthSession>, host: H) -> Result<Self> {
        let client = DriveClient::new(config.drive.endpoints.clone())?;
        let mut distributor = Distributor::new(client, config.drive.folder_id.clone());
        if let Some(url) = &config.drive.folder_url {
            distributor = distributor.with_folder_url(url.clone());
        }
        let retriever = Retriever::new(
            config.ui.clone(),
            config.timeouts.clone(),
            config.browser.download_dir.clone(),
        );
        Ok(Self::new(
            session,
            distributor,
            host,
            retriever,
            config.timeouts.case(),
        ))
    }

    pub fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Runs one fixture end to end within the case time limit.
    pub async fn run_case(&self, fixture: &Fixture) -> Result<CaseOutcome> {
        let span = info_span!("case", fixture = %fixture.name);
        self.run_steps(fixture, Instant::now() + self.case_timeout)
            .instrument(span)
            .await
    }

    async fn run_steps(&self, fixture: &Fixture, deadline: Instant) -> Result<CaseOutcome> {
        // Step 1: Distribute
        let link = self
            .before(deadline, fixture, self.distributor.upload(&self.session, &fixture.path))
            .await?;

        // Step 2: Retrieve. The context outlives the timed step so it is
        // closed on every exit path.
        let context = self
            .before(deadline, fixture, self.host.new_context())
            .await?;
        let downloaded = self
            .before(
                deadline,
                fixture,
                self.retriever
                    .download(&context, &fixture.name, &link.url, fixture.password.as_ref())
                    .instrument(info_span!("retrieve")),
            )
            .await;
        if let Err(e) = context.close().await {
            warn!("Browser context for {} did not close: {}", fixture.name, e);
        }
        let artifact = downloaded?;

        // Step 3: Inspect
        let permissions = self.inspect(&artifact.path, fixture.password.as_ref())?;
        log_breakdown(&fixture.name, &permissions);

        let printable = permissions.can_print();
        info!(
            fixture = %fixture.name,
            printable,
            expected = fixture.expect_printable,
            "Case finished"
        );

        Ok(CaseOutcome {
            fixture: fixture.name.clone(),
            artifact,
            permissions,
            printable,
            expected: fixture.expect_printable,
        })
    }

    /// Runs one step of a case, failing with `CaseTimeout` once the case
    /// deadline passes.
    async fn before<T, E, F>(&self, deadline: Instant, fixture: &Fixture, step: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<PrintCheckError>,
    {
        match tokio::time::timeout_at(deadline, step).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(PrintCheckError::CaseTimeout {
                case: fixture.name.clone(),
                limit: self.case_timeout,
            }),
        }
    }

    fn inspect(&self, path: &Path, password: Option<&SecretString>) -> Result<PermissionSet> {
        Ok(self.validator.get_permissions(path, password)?)
    }

    /// Runs every fixture concurrently. A failing case does not affect the
    /// others.
    pub async fn run_all(&self, fixtures: &[Fixture]) -> Vec<CaseReport> {
        join_all(fixtures.iter().map(|fixture| async move {
            let result = self.run_case(fixture).await;
            if let Err(e) = &result {
                warn!("Case {} failed: {}", fixture.name, e);
            }
            CaseReport {
                fixture: fixture.name.clone(),
                result,
            }
        }))
        .await
    }

    /// Deletes everything uploaded into the folder.
    pub async fn teardown(&self) -> std::result::Result<CleanupReport, CleanupError> {
        self.distributor.cleanup(&self.session).await
    }

    /// Number of live children in the folder.
    pub async fn remaining_files(&self) -> std::result::Result<usize, CleanupError> {
        self.distributor
            .list_children(&self.session)
            .await
            .map(|files| files.len())
            .map_err(|e| CleanupError::List {
                folder_id: self.distributor.folder_id().to_string(),
                source: e,
            })
    }

    /// Runs all fixtures, then always tears down and checks the folder is
    /// empty.
    pub async fn run_suite(&self, fixtures: &[Fixture]) -> SuiteReport {
        let cases = self.run_all(fixtures).await;

        let span = info_span!("teardown");
        let (cleanup, remaining) = async {
            let cleanup = self.teardown().await;
            if let Err(e) = &cleanup {
                warn!("{}", e);
            }
            let remaining = self.remaining_files().await;
            (cleanup, remaining)
        }
        .instrument(span)
        .await;

        SuiteReport {
            cases,
            cleanup,
            remaining,
        }
    }
}

fn log_breakdown(fixture: &str, permissions: &PermissionSet) {
    if permissions.is_unrestricted() {
        info!("{}: no restrictions, every permission granted", fixture);
    }
    for (flag, enabled) in permissions.breakdown() {
        info!(
            "{}: {} {}",
            fixture,
            flag,
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

/// Full live run: authenticate, launch Chrome, run every configured fixture
/// and tear down.
pub async fn run_configured_suite(config: &SuiteConfig) -> Result<SuiteReport> {
    let fixtures = Fixture::from_configs(&config.fixtures)?;

    let session = Authenticator::from_config(&config.drive)?
        .authenticate()
        .instrument(info_span!("authenticate"))
        .await?;

    let browser = ChromeBrowser::launch(&config.browser).await?;
    let runner = SuiteRunner::from_config(config, Arc::new(session), browser)?;
    let report = runner.run_suite(&fixtures).await;

    if let Err(e) = runner.into_host().close().await {
        warn!("Browser shutdown failed: {}", e);
    }
    Ok(report)
}
