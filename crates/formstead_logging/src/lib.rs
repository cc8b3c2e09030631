//! Shared logging utilities for Formstead binaries.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "formstead=info,formstead_db=info";
const HOME_ENV: &str = "FORMSTEAD_HOME";

/// Logging configuration shared by Formstead binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Console gets debug output for Formstead crates.
    pub verbose: bool,
    /// Console only shows errors. The log file is unaffected.
    pub quiet: bool,
    /// Defaults to [`logs_dir`].
    pub log_dir: Option<PathBuf>,
}

/// Keeps the background file writer alive; drop it last.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize tracing with a daily rolling file writer and stderr output.
///
/// stdout is left alone so commands can print machine-readable results.
/// If the log directory cannot be created, logging continues on stderr only.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.quiet {
        EnvFilter::new("error")
    } else if config.verbose {
        EnvFilter::new("formstead=debug,formstead_db=debug,formstead_schema=debug")
    } else {
        file_filter.clone()
    };

    let log_dir = match config.log_dir {
        Some(dir) => Ok(dir),
        None => logs_dir(),
    };

    let mut file_guard = None;
    let file_layer = match log_dir.and_then(|dir| ensure_dir(&dir)) {
        Ok(dir) => {
            let file_name = format!("{}.log", sanitize_name(config.app_name));
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: file_guard })
}

/// Get the Formstead home directory: ~/.formstead, or $FORMSTEAD_HOME
pub fn formstead_home() -> Result<PathBuf> {
    resolve_home(std::env::var_os(HOME_ENV).map(PathBuf::from), dirs::home_dir())
}

fn resolve_home(override_path: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    home.map(|h| h.join(".formstead"))
        .ok_or_else(|| anyhow!("Could not determine home directory; set {}", HOME_ENV))
}

/// Get the logs directory: ~/.formstead/logs
pub fn logs_dir() -> Result<PathBuf> {
    Ok(formstead_home()?.join("logs"))
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
