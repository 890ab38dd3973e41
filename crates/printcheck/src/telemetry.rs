//! Logging setup for suite runs.
//!
//! The HTTP/OAuth layer logs through the `log` facade, the pipeline through
//! `tracing`. `LogTracer` forwards the former into the latter so both end up
//! in one subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "info";

/// Output format for suite logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Installs the global subscriber, writing to stderr. Safe to call more
/// than once; only the first call wins, which matters because every
/// integration test binary calls it from its own setup.
pub fn init_logging(format: LogFormat) {
    install(format, std::io::stderr);
}

fn install<W>(format: LogFormat, writer: W)
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let _ = tracing_log::LogTracer::init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(writer)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_writer(writer)),
        ),
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
