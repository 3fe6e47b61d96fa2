//! Service seams of the sync engine
//!
//! The portal, the spreadsheet backend and the wall clock are reached only
//! through these traits. Production implementations live in the
//! infrastructure layer; tests substitute in-memory ones.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{PortalError, SheetsError};
use crate::domain::sheet_range::{MajorDimension, SheetRange, ValueInputOption};

/// Authenticated handle to the reporting portal.
///
/// Holds whatever cookies the login left behind. There is no expiry
/// detection: a stale session shows up downstream as pages without data.
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// Authenticated GET returning the response body.
    async fn get_page(&self, url: &str) -> Result<String, PortalError>;

    /// Post the login form again on the same cookie jar.
    async fn reauthenticate(&self) -> Result<(), PortalError>;
}

/// The three `values.*` operations of the spreadsheet backend.
#[async_trait]
pub trait SpreadsheetBackend: Send + Sync {
    async fn values_get(&self, range: &SheetRange) -> Result<ValueRange, SheetsError>;

    async fn values_update(
        &self,
        range: &SheetRange,
        option: ValueInputOption,
        body: &ValueRange,
    ) -> Result<(), SheetsError>;

    async fn values_batch_update(&self, body: &BatchUpdateValuesRequest) -> Result<(), SheetsError>;
}

/// Local wall clock and the only sleep the loop ever performs.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    async fn sleep(&self, duration: Duration);
}

/// A block of cell values as the backend exchanges them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<MajorDimension>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// Body of a `values.batchUpdate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateValuesRequest {
    pub value_input_option: ValueInputOption,
    pub data: Vec<ValueRange>,
}
