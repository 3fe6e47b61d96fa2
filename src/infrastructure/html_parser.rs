//! HTML decoding of the portal's upload-report page
//!
//! The page is a bare table whose `<td>` sequence has a fixed layout. The
//! upload date and the status are bound to fixed offsets in that sequence
//! through [`UploadReportSchema`].

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::entities::StatusRecord;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Fixed cell offsets of the upload-report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReportSchema {
    /// Zero-based index of the upload-date cell
    pub upload_date_cell: usize,
    /// Zero-based index of the status cell
    pub status_cell: usize,
}

impl Default for UploadReportSchema {
    fn default() -> Self {
        Self {
            upload_date_cell: 1,
            status_cell: 4,
        }
    }
}

impl UploadReportSchema {
    /// Smallest cell count that covers every bound offset.
    #[must_use]
    pub fn min_cells(&self) -> usize {
        self.upload_date_cell.max(self.status_cell) + 1
    }
}

/// Decodes upload-report pages into [`StatusRecord`]s
#[derive(Debug, Clone)]
pub struct UploadReportParser {
    schema: UploadReportSchema,
    cell_selector: Selector,
}

impl UploadReportParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_schema(UploadReportSchema::default())
    }

    pub fn with_schema(schema: UploadReportSchema) -> ParsingResult<Self> {
        let cell_selector =
            Selector::parse("td").map_err(|e| ParsingError::invalid_selector("td", e))?;
        Ok(Self {
            schema,
            cell_selector,
        })
    }

    /// Decode one page.
    ///
    /// - no table cells at all: an empty or error page, both fields absent
    /// - fewer cells than the schema covers: [`ParsingError::TooFewCells`]
    /// - otherwise status and upload date from their fixed offsets
    pub fn parse(&self, body: &str) -> ParsingResult<StatusRecord> {
        let document = Html::parse_document(body);
        let cells: Vec<ElementRef<'_>> = document.select(&self.cell_selector).collect();

        if cells.is_empty() {
            debug!("Upload report page has no table cells");
            return Ok(StatusRecord::absent());
        }

        let required = self.schema.min_cells();
        if cells.len() < required {
            return Err(ParsingError::TooFewCells {
                found: cells.len(),
                required,
            });
        }

        Ok(StatusRecord::new(
            cell_text(cells[self.schema.status_cell]),
            cell_text(cells[self.schema.upload_date_cell]),
        ))
    }
}

/// Trimmed text content of a cell; blank cells read as absent.
fn cell_text(cell: ElementRef<'_>) -> Option<String> {
    let text = cell.text().collect::<String>();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
