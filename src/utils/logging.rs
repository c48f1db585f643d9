use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{Rotation, RollingFileAppender};
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;

/// Which process is writing. Each gets its own file prefix inside the logs directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Cli,
    Tracker,
}

impl LogSource {
    pub fn file_prefix(self) -> &'static str {
        match self {
            LogSource::Cli => "cli",
            LogSource::Tracker => "tracker",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    pub source: LogSource,
    /// Falls back to `RUST_LOG`, then to debug.
    pub level: Option<LevelFilter>,
    pub echo_stderr: bool,
}

/// Only events from this crate pass.
fn crate_filter(level: Option<LevelFilter>) -> EnvFilter {
    let level = level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()));
    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace('-', "_")
    ))
}

fn daily_appender(source: LogSource, application_data_path: &Path) -> Result<RollingFileAppender> {
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(source.file_prefix())
        .build(application_data_path.join(LOG_DIR))?)
}

/// Logs always go to a daily rotated file. Stderr is opt-in since stdin and stdout carry the
/// browser bridge while serving.
pub fn enable_logging(application_data_path: &Path, options: LogOptions) -> Result<()> {
    let appender = daily_appender(options.source, application_data_path)?;
    let echo = options.echo_stderr;
    let stderr = std::io::stderr.with_filter(move |_| echo);

    tracing_subscriber::fmt()
        .with_env_filter(crate_filter(options.level))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .with_ansi(false)
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .try_init();
});
