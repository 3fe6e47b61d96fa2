//! Time-windowed sync loop
//!
//! ```text
//! Startup ──► WaitingWindow ──► Polling ──► Writing ──► Sleeping
//!                 ▲    │                                   │
//!                 └────┘ (outside window)                  │
//!                 ▲                                        │
//!                 └────────────────────────────────────────┘
//! ```
//!
//! Identifiers are read once in `Startup`. Each cycle fetches the first
//! `batch_size` of them, writes statuses then dates (one batch call each),
//! then stamps the update cell. A spreadsheet failure at any of those writes
//! ends the loop; portal failures only leave absent cells behind.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::batch_collector::BatchCollector;
use crate::application::errors::{SyncError, SyncResult};
use crate::application::spreadsheet_gateway::SpreadsheetGateway;
use crate::domain::active_window::ActiveWindow;
use crate::domain::entities::{EntityIdentifier, ResultTable};
use crate::domain::services::{Clock, PortalSession};
use crate::domain::sheet_range::{MajorDimension, SheetRange};
use crate::infrastructure::config::{AppConfig, ConfigError, SheetRanges};

/// Everything the loop needs from configuration, already parsed.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub window: ActiveWindow,
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_idle_recheck: Duration,
    pub timestamp_format: String,
    /// Re-login once a cycle sees this many absent records in a row
    pub reauth_after_consecutive_empty: Option<usize>,
    pub ranges: SheetRanges,
}

impl SyncSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let schedule = &config.schedule;
        Ok(Self {
            window: schedule.active_window()?,
            poll_interval: schedule.poll_interval(),
            batch_size: schedule.batch_size,
            max_idle_recheck: schedule.max_idle_recheck(),
            timestamp_format: schedule.checked_timestamp_format()?.to_string(),
            reauth_after_consecutive_empty: schedule.reauth_after_consecutive_empty,
            ranges: config.sheets.ranges()?,
        })
    }
}

/// Where the loop currently is. `Writing` carries the table still to be
/// written, so a failed write leaves it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Startup,
    WaitingWindow,
    Polling,
    Writing(ResultTable),
    Sleeping,
}

impl SyncState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Startup => "STARTUP",
            Self::WaitingWindow => "WAITING_WINDOW",
            Self::Polling => "POLLING",
            Self::Writing(_) => "WRITING",
            Self::Sleeping => "SLEEPING",
        }
    }
}

pub struct SyncLoop {
    settings: SyncSettings,
    session: Arc<dyn PortalSession>,
    collector: BatchCollector,
    gateway: SpreadsheetGateway,
    clock: Arc<dyn Clock>,
    identifiers: Vec<EntityIdentifier>,
    state: SyncState,
    cycle_id: Uuid,
}

impl SyncLoop {
    pub fn new(
        settings: SyncSettings,
        session: Arc<dyn PortalSession>,
        collector: BatchCollector,
        gateway: SpreadsheetGateway,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            session,
            collector,
            gateway,
            clock,
            identifiers: Vec::new(),
            state: SyncState::Startup,
            cycle_id: Uuid::nil(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SyncState {
        &self.state
    }

    /// Identifier cache; empty until `Startup` has run.
    #[must_use]
    pub fn identifiers(&self) -> &[EntityIdentifier] {
        &self.identifiers
    }

    /// Run forever. Returns only on a fatal spreadsheet or startup error.
    pub async fn run(&mut self) -> SyncResult<Infallible> {
        info!(
            "🚀 Sync loop starting: window {}-{}, every {}s, {} identifiers per cycle",
            self.settings.window.start(),
            self.settings.window.end(),
            self.settings.poll_interval.as_secs(),
            self.settings.batch_size
        );

        loop {
            if let Err(e) = self.step().await.map(|_| ()) {
                error!(state = self.state.name(), "❌ Sync loop stopped: {}", e);
                return Err(e);
            }
        }
    }

    /// Perform one transition. On error the state is left unchanged.
    pub async fn step(&mut self) -> SyncResult<&SyncState> {
        let next = match &self.state {
            SyncState::Startup => {
                self.identifiers = self.load_identifiers().await?;
                SyncState::WaitingWindow
            }
            SyncState::WaitingWindow => self.wait_for_window().await,
            SyncState::Polling => {
                let span = self.cycle_span();
                SyncState::Writing(self.poll().instrument(span).await)
            }
            SyncState::Writing(table) => {
                let span = self.cycle_span();
                self.write_back(table).instrument(span).await?;
                SyncState::Sleeping
            }
            SyncState::Sleeping => {
                debug!("Sleeping {}s until next cycle", self.settings.poll_interval.as_secs());
                self.clock.sleep(self.settings.poll_interval).await;
                SyncState::WaitingWindow
            }
        };

        debug!(from = self.state.name(), to = next.name(), "State transition");
        self.state = next;
        Ok(&self.state)
    }

    async fn load_identifiers(&self) -> SyncResult<Vec<EntityIdentifier>> {
        let range = &self.settings.ranges.codes;
        let identifiers = self
            .gateway
            .read_identifiers(range)
            .await
            .map_err(|source| SyncError::Identifiers {
                range: range.to_string(),
                source,
            })?;

        if identifiers.is_empty() {
            warn!("No identifiers found in {}; cycles will write empty batches", range);
        } else {
            info!("📋 Loaded {} identifiers from {}", identifiers.len(), range);
        }
        Ok(identifiers)
    }

    async fn wait_for_window(&mut self) -> SyncState {
        let now = self.clock.now().time();
        if self.settings.window.contains(now) {
            self.cycle_id = Uuid::new_v4();
            info!(cycle_id = %self.cycle_id, "Active window open at {}", now.format("%H:%M:%S"));
            return SyncState::Polling;
        }

        let wait = self
            .settings
            .window
            .time_until_open(now)
            .min(self.settings.max_idle_recheck);
        debug!(
            "Outside active window {}-{} at {}; rechecking in {}s",
            self.settings.window.start(),
            self.settings.window.end(),
            now.format("%H:%M:%S"),
            wait.as_secs()
        );
        self.clock.sleep(wait).await;
        SyncState::WaitingWindow
    }

    async fn poll(&self) -> ResultTable {
        let count = self.settings.batch_size.min(self.identifiers.len());
        let batch = &self.identifiers[..count];
        info!("🔍 Polling {} of {} identifiers", count, self.identifiers.len());
        self.collector.collect_all(self.session.as_ref(), batch).await
    }

    async fn write_back(&self, table: &ResultTable) -> SyncResult<()> {
        let ranges = &self.settings.ranges;

        self.write_batch("statuses", &ranges.status, &table.statuses()).await?;
        self.write_batch("upload dates", &ranges.date, &table.upload_dates()).await?;

        let stamp = self
            .clock
            .now()
            .format(&self.settings.timestamp_format)
            .to_string();
        self.gateway
            .write_cell(&ranges.update_time, &stamp)
            .await
            .map_err(|source| SyncError::SheetWrite {
                what: "update time",
                range: ranges.update_time.to_string(),
                source,
            })?;
        info!("✅ Spreadsheet updated ({})", stamp);

        self.reauthenticate_if_stale(table).await;
        Ok(())
    }

    async fn write_batch(
        &self,
        what: &'static str,
        range: &SheetRange,
        values: &[Option<String>],
    ) -> SyncResult<()> {
        self.gateway
            .batch_write(range, values, MajorDimension::Columns)
            .await
            .map_err(|source| SyncError::SheetWrite {
                what,
                range: range.to_string(),
                source,
            })
    }

    async fn reauthenticate_if_stale(&self, table: &ResultTable) {
        let Some(threshold) = self.settings.reauth_after_consecutive_empty else {
            return;
        };

        let run = table.longest_absent_run();
        if run < threshold {
            return;
        }

        warn!(
            "🔄 {} consecutive entities came back empty (threshold {}); logging in again",
            run, threshold
        );
        match self.session.reauthenticate().await {
            Ok(()) => info!("Portal session re-established"),
            Err(e) => error!("Portal re-login failed, keeping current session: {}", e),
        }
    }

    fn cycle_span(&self) -> tracing::Span {
        info_span!("sync_cycle", cycle_id = %self.cycle_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::status_fetcher::StatusFetcher;
    use crate::infrastructure::html_parser::UploadReportParser;
    use crate::test_utils::{FakePortal, FakeSheets, ManualClock, full_page};
    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::json;

    const TEMPLATE: &str = "https://portal.test/s?id={id}";

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn settings() -> SyncSettings {
        let mut config = AppConfig::default();
        config.sheets.spreadsheet_id = "sheet".to_string();
        config.sheets.access_token = Some("token".to_string());
        SyncSettings::from_config(&config).unwrap()
    }

    fn sync_loop(
        settings: SyncSettings,
        portal: Arc<FakePortal>,
        sheets: Arc<FakeSheets>,
        clock: Arc<ManualClock>,
    ) -> SyncLoop {
        let collector =
            BatchCollector::new(StatusFetcher::new(TEMPLATE, UploadReportParser::new().unwrap()));
        SyncLoop::new(settings, portal, collector, SpreadsheetGateway::new(sheets), clock)
    }

    fn codes(ids: &[&str]) -> Vec<Vec<serde_json::Value>> {
        ids.iter().map(|id| vec![json!(id)]).collect()
    }

    #[tokio::test]
    async fn startup_caches_identifiers() {
        let sheets = Arc::new(FakeSheets::default().with_range("Sheet1!A2:A163", codes(&["1", "2"])));
        let mut sync = sync_loop(
            settings(),
            Arc::new(FakePortal::default()),
            sheets,
            Arc::new(ManualClock::at(at(7, 0))),
        );

        assert_eq!(sync.step().await.unwrap(), &SyncState::WaitingWindow);
        assert_eq!(sync.identifiers(), &["1".into(), "2".into()]);
    }

    #[tokio::test]
    async fn outside_window_sleeps_capped_and_stays() {
        let clock = Arc::new(ManualClock::at(at(6, 0)));
        let mut sync = sync_loop(
            settings(),
            Arc::new(FakePortal::default()),
            Arc::new(FakeSheets::default()),
            clock.clone(),
        );
        sync.step().await.unwrap();

        assert_eq!(sync.step().await.unwrap(), &SyncState::WaitingWindow);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(300)]);
    }

    #[tokio::test]
    async fn polls_only_the_leading_batch() {
        let ids: Vec<String> = (1..=8).map(|i| i.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let sheets = Arc::new(FakeSheets::default().with_range("Sheet1!A2:A163", codes(&id_refs)));
        let portal = Arc::new(FakePortal::default().with_page(
            TEMPLATE.replace("{id}", "1"),
            full_page("ok", "01.10.2026"),
        ));
        let mut sync = sync_loop(settings(), portal.clone(), sheets, Arc::new(ManualClock::at(at(9, 0))));

        sync.step().await.unwrap();
        assert_eq!(sync.step().await.unwrap(), &SyncState::Polling);
        let state = sync.step().await.unwrap().clone();

        assert_eq!(portal.requests().len(), 5);
        let SyncState::Writing(table) = state else {
            panic!("expected Writing, got {state:?}");
        };
        assert_eq!(table.len(), 5);
        assert_eq!(table.statuses()[0].as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn reauth_is_off_by_default() {
        let sheets = Arc::new(FakeSheets::default().with_range("Sheet1!A2:A163", codes(&["1", "2", "3"])));
        let portal = Arc::new(FakePortal::default());
        let mut sync = sync_loop(settings(), portal.clone(), sheets, Arc::new(ManualClock::at(at(9, 0))));

        for _ in 0..4 {
            sync.step().await.unwrap();
        }
        assert_eq!(sync.state(), &SyncState::Sleeping);
        assert_eq!(portal.reauthentications(), 0);
    }

    #[tokio::test]
    async fn sleeping_waits_poll_interval() {
        let clock = Arc::new(ManualClock::at(at(9, 0)));
        let mut sync = sync_loop(
            settings(),
            Arc::new(FakePortal::default()),
            Arc::new(FakeSheets::default()),
            clock.clone(),
        );
        for _ in 0..5 {
            sync.step().await.unwrap();
        }

        assert_eq!(sync.state(), &SyncState::WaitingWindow);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(600)]);
        assert_eq!(clock.now(), at(9, 10));
    }
}
