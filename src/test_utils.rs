//! Test utilities for org-status-sync
//!
//! In-memory stand-ins for the portal, the spreadsheet backend and the wall
//! clock, so the sync engine can be driven deterministically in unit and
//! integration tests.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::errors::{PortalError, SheetsError};
use crate::domain::services::{BatchUpdateValuesRequest, Clock, PortalSession, SpreadsheetBackend, ValueRange};
use crate::domain::sheet_range::{SheetRange, ValueInputOption};

/// Upload-report page with the given status and upload date in their
/// fixed cells.
#[must_use]
pub fn full_page(status: &str, upload_date: &str) -> String {
    format!(
        "<html><body><table><tr>\
         <td>report.xlsx</td><td>{upload_date}</td><td>operator</td><td>14 KB</td><td>{status}</td>\
         </tr></table></body></html>"
    )
}

/// Page the portal serves when there is no data (or the session is stale).
pub const EMPTY_PAGE: &str = "<html><body><div class=\"empty\">Нет данных</div></body></html>";

/// Portal serving canned pages by exact URL; unknown URLs fail with 404.
#[derive(Default)]
pub struct FakePortal {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
    reauthentications: AtomicUsize,
}

impl FakePortal {
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn reauthentications(&self) -> usize {
        self.reauthentications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalSession for FakePortal {
    async fn get_page(&self, url: &str) -> Result<String, PortalError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.pages.get(url).cloned().ok_or_else(|| PortalError::Status {
            status: 404,
            url: url.to_string(),
        })
    }

    async fn reauthenticate(&self) -> Result<(), PortalError> {
        self.reauthentications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One call received by [`FakeSheets`].
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCall {
    Get(String),
    Update {
        range: String,
        option: ValueInputOption,
        body: ValueRange,
    },
    BatchUpdate(BatchUpdateValuesRequest),
}

/// Spreadsheet backend recording every call.
#[derive(Default)]
pub struct FakeSheets {
    ranges: HashMap<String, ValueRange>,
    calls: Mutex<Vec<SheetCall>>,
    fail_get: bool,
    fail_update: bool,
    fail_batch_update: bool,
}

impl FakeSheets {
    /// Serve `rows` for `values.get` on `range`.
    #[must_use]
    pub fn with_range(mut self, range: &str, rows: Vec<Vec<serde_json::Value>>) -> Self {
        self.ranges.insert(
            range.to_string(),
            ValueRange {
                range: Some(range.to_string()),
                major_dimension: None,
                values: rows,
            },
        );
        self
    }

    #[must_use]
    pub fn failing_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    /// Reject every single-range `values.update`.
    #[must_use]
    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    #[must_use]
    pub fn failing_batch_update(mut self) -> Self {
        self.fail_batch_update = true;
        self
    }

    pub fn calls(&self) -> Vec<SheetCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Bodies of the batch updates received so far.
    pub fn batch_updates(&self) -> Vec<BatchUpdateValuesRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SheetCall::BatchUpdate(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SheetCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn rejection() -> SheetsError {
        SheetsError::Status {
            status: 503,
            body: "backend unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SpreadsheetBackend for FakeSheets {
    async fn values_get(&self, range: &SheetRange) -> Result<ValueRange, SheetsError> {
        self.record(SheetCall::Get(range.to_string()));
        if self.fail_get {
            return Err(Self::rejection());
        }
        Ok(self.ranges.get(range.as_str()).cloned().unwrap_or_default())
    }

    async fn values_update(
        &self,
        range: &SheetRange,
        option: ValueInputOption,
        body: &ValueRange,
    ) -> Result<(), SheetsError> {
        self.record(SheetCall::Update {
            range: range.to_string(),
            option,
            body: body.clone(),
        });
        if self.fail_update {
            return Err(Self::rejection());
        }
        Ok(())
    }

    async fn values_batch_update(&self, body: &BatchUpdateValuesRequest) -> Result<(), SheetsError> {
        self.record(SheetCall::BatchUpdate(body.clone()));
        if self.fail_batch_update {
            return Err(Self::rejection());
        }
        Ok(())
    }
}

/// Clock that only moves when slept on.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or(NaiveDateTime::MIN)
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        if let (Ok(mut now), Ok(delta)) = (self.now.lock(), TimeDelta::from_std(duration)) {
            *now += delta;
        }
    }
}
