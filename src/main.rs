//! org-status-sync daemon
//!
//! Usage: `org-status-sync [CONFIG_PATH]`. Runs until killed or until a
//! spreadsheet write fails.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use org_status_sync_lib::application::{
    BatchCollector, SpreadsheetGateway, StatusFetcher, SyncLoop, SyncSettings,
};
use org_status_sync_lib::infrastructure::config::{AppConfig, resolve_config_path};
use org_status_sync_lib::infrastructure::logging::log_system_info;
use org_status_sync_lib::infrastructure::{
    GoogleSheetsClient, HttpPortalSession, SystemClock, UploadReportParser, init_logging_with_config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = resolve_config_path(std::env::args_os().nth(1).map(PathBuf::from));
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    log_system_info(&config.logging);
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using defaults and environment"),
    }

    let settings = SyncSettings::from_config(&config)?;

    let session = HttpPortalSession::open_with_config(&config.portal)
        .await
        .context("Failed to build portal HTTP client")?;
    let sheets = GoogleSheetsClient::new(&config.sheets).context("Failed to build spreadsheet client")?;

    let parser = UploadReportParser::new()?;
    let collector = BatchCollector::new(StatusFetcher::from_config(&config.portal, parser));

    let mut sync = SyncLoop::new(
        settings,
        Arc::new(session),
        collector,
        SpreadsheetGateway::new(Arc::new(sheets)),
        Arc::new(SystemClock),
    );

    tokio::select! {
        result = sync.run() => match result {
            Ok(never) => match never {},
            Err(e) => {
                error!("Fatal: {}", e);
                Err(e.into())
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
