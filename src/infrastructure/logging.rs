//! Logging system configuration and initialization
//!
//! This module provides the logging setup for the sync service:
//! - Console output and/or daily rolling log files
//! - Configuration based log level control, overridable with `RUST_LOG`
//! - Structured JSON logging (optional)
//! - Local wall-clock timestamps, matching the active-window clock

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Subscriber, info, warn};
use tracing_appender::non_blocking;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, MakeWriter, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Dependency targets clamped below the application level unless tracing.
const QUIET_TARGETS: &[(&str, &str)] = &[
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
    ("tokio", "info"),
    ("runtime", "warn"),
];

/// Application targets (library and binary crate names)
const APP_TARGETS: &[&str] = &["org_status_sync_lib", "org_status_sync"];

/// Local time formatter
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Resolve the log directory: configured path, else the platform data dir,
/// else `./logs`.
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("org-status-sync").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Build the filter: `RUST_LOG` if set, otherwise the configured level
/// with noisy dependencies suppressed and per-module overrides applied.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if !config.level.to_lowercase().contains("trace") {
        for (target, level) in QUIET_TARGETS {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
        for target in APP_TARGETS {
            filter = filter.add_directive(format!("{target}={}", config.level).parse()?);
        }
    }

    for (module, level) in &config.module_filters {
        filter = filter.add_directive(
            format!("{module}={level}")
                .parse()
                .map_err(|e| anyhow!("Invalid module filter {}={}: {}", module, level, e))?,
        );
    }

    Ok(filter)
}

/// Initialize logging with the given configuration
///
/// # Environment Variable Override
/// ```bash
/// # Show detailed HTTP logs
/// RUST_LOG="debug,reqwest=debug,hyper=debug" org-status-sync
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let log_dir = get_log_directory(config);

    let file_writer = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        cleanup_old_logs(&log_dir, config)?;

        let appender = RollingBuilder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .max_log_files(config.max_files.max(1))
            .build(&log_dir)
            .map_err(|e| anyhow!("Failed to create rolling log file in {:?}: {}", log_dir, e))?;
        let (writer, guard) = non_blocking(appender);

        // Store the guard globally to prevent it from being dropped
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);
        Some(writer)
    } else {
        None
    };

    build_subscriber(config, env_filter, file_writer)?.try_init()?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
    }

    Ok(())
}

/// Stack the filter, the optional file layer and the optional stdout layer.
fn build_subscriber<W>(
    config: &LoggingConfig,
    env_filter: EnvFilter,
    file_writer: Option<W>,
) -> Result<Box<dyn Subscriber + Send + Sync>>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = Registry::default().with(env_filter);
    let console = config.console_output;

    let subscriber: Box<dyn Subscriber + Send + Sync> = match (file_writer, config.json_format) {
        (Some(file_writer), true) => {
            let file_layer = fmt::Layer::new()
                .json()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false);
            let console_layer = console.then(|| {
                fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(LocalTimeFormatter)
                    .with_target(false)
            });
            Box::new(registry.with(file_layer).with(console_layer))
        }
        (Some(file_writer), false) => {
            let file_layer = fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(true)
                .with_ansi(false);
            let console_layer = console.then(|| {
                fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(LocalTimeFormatter)
                    .with_target(false)
            });
            Box::new(registry.with(file_layer).with(console_layer))
        }
        (None, true) if console => Box::new(
            registry.with(
                fmt::Layer::new()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_timer(LocalTimeFormatter),
            ),
        ),
        (None, false) if console => Box::new(
            registry.with(
                fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(LocalTimeFormatter)
                    .with_target(false),
            ),
        ),
        (None, _) => return Err(anyhow!("No logging output configured")),
    };

    Ok(subscriber)
}

/// Remove the oldest log files beyond `max_files`.
fn cleanup_old_logs(log_dir: &Path, config: &LoggingConfig) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(&config.file_prefix));
        if path.is_file() && is_ours {
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                log_files.push((path, modified));
            }
        }
    }

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let keep = config.max_files.max(1);
    let mut removed = 0;
    for (path, _) in log_files.iter().skip(keep) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove old log file {:?}: {}", path, e);
        } else {
            removed += 1;
        }
    }

    Ok(removed)
}

/// Log system information for diagnostics
pub fn log_system_info(config: &LoggingConfig) {
    info!("=== Org Status Sync ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
    if config.file_output {
        info!("Log directory: {:?}", get_log_directory(config));
    }
}
