//! Org Status Sync - report-status mirror from the GIVC cabinet to Google Sheets
//!
//! Periodically scrapes per-organization upload statuses and dates from the
//! reporting portal and writes them back into fixed spreadsheet ranges,
//! stamping the time of the last successful update.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use application::{SyncError, SyncLoop, SyncSettings};
pub use infrastructure::AppConfig;
