//! Narrow read/write surface over the spreadsheet backend
//!
//! - `read_range`: raw cells of a range, flattened row by row
//! - `write_cell`: single-cell overwrite, `USER_ENTERED`
//! - `batch_write`: one multi-value overwrite, `RAW`

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::entities::EntityIdentifier;
use crate::domain::errors::SheetsError;
use crate::domain::services::{BatchUpdateValuesRequest, SpreadsheetBackend, ValueRange};
use crate::domain::sheet_range::{MajorDimension, SheetRange, ValueInputOption};

/// Build a `values.batchUpdate` body placing `values` as the single
/// row/column of `range`.
///
/// `None` entries become JSON `null`. An empty `values` still yields one
/// data entry holding one empty list.
#[must_use]
pub fn build_batch_update_body(
    values: &[Option<String>],
    range: &SheetRange,
    value_input_option: ValueInputOption,
    major_dimension: MajorDimension,
) -> BatchUpdateValuesRequest {
    let line = values
        .iter()
        .map(|value| {
            value
                .as_ref()
                .map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.clone()))
        })
        .collect();

    BatchUpdateValuesRequest {
        value_input_option,
        data: vec![ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some(major_dimension),
            values: vec![line],
        }],
    }
}

#[derive(Clone)]
pub struct SpreadsheetGateway {
    backend: Arc<dyn SpreadsheetBackend>,
}

impl SpreadsheetGateway {
    #[must_use]
    pub fn new(backend: Arc<dyn SpreadsheetBackend>) -> Self {
        Self { backend }
    }

    /// Raw cell values of `range`, rows concatenated in order.
    pub async fn read_range(&self, range: &SheetRange) -> Result<Vec<serde_json::Value>, SheetsError> {
        let block = self.backend.values_get(range).await?;
        Ok(block.values.into_iter().flatten().collect())
    }

    /// Identifiers stored in `range`; cells that are not strings or
    /// numbers are skipped with a warning.
    pub async fn read_identifiers(&self, range: &SheetRange) -> Result<Vec<EntityIdentifier>, SheetsError> {
        let cells = self.read_range(range).await?;
        let mut identifiers = Vec::with_capacity(cells.len());
        for cell in &cells {
            match EntityIdentifier::from_cell(cell) {
                Some(identifier) => identifiers.push(identifier),
                None => warn!("Skipping non-identifier cell {} in {}", cell, range),
            }
        }
        Ok(identifiers)
    }

    /// Overwrite one cell; the backend interprets the value as typed input.
    pub async fn write_cell(&self, range: &SheetRange, value: &str) -> Result<(), SheetsError> {
        let body = ValueRange {
            range: None,
            major_dimension: None,
            values: vec![vec![serde_json::Value::String(value.to_string())]],
        };
        debug!("Writing '{}' to {}", value, range);
        self.backend
            .values_update(range, ValueInputOption::UserEntered, &body)
            .await
    }

    /// Overwrite `range` with `values` verbatim in one call.
    pub async fn batch_write(
        &self,
        range: &SheetRange,
        values: &[Option<String>],
        major_dimension: MajorDimension,
    ) -> Result<(), SheetsError> {
        if let Some(capacity) = range.capacity_along(major_dimension) {
            if values.len() > capacity as usize {
                warn!(
                    "{} values exceed the {} cells of {}; the backend will reject or expand the write",
                    values.len(),
                    capacity,
                    range
                );
            }
        }

        let body = build_batch_update_body(values, range, ValueInputOption::Raw, major_dimension);
        debug!("Batch writing {} values to {}", values.len(), range);
        self.backend.values_batch_update(&body).await
    }
}
