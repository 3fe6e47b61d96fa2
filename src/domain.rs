//! Domain module - Core sync entities and service seams
//!
//! This module contains the value types that flow through one sync cycle
//! (identifiers, status records, result tables, sheet ranges, the active
//! window) and the traits behind which the portal, the spreadsheet backend
//! and the wall clock are reached.

pub mod active_window;
pub mod entities;
pub mod errors;
pub mod services;
pub mod sheet_range;

// Re-export commonly used items for convenience
pub use active_window::ActiveWindow;
pub use entities::{EntityIdentifier, ResultTable, StatusRecord};
pub use errors::{PortalError, SheetsError};
pub use services::{Clock, PortalSession, SpreadsheetBackend};
pub use sheet_range::{MajorDimension, SheetRange, ValueInputOption};
