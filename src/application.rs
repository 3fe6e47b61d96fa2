//! Application layer module
//!
//! The sync engine proper: per-entity fetch, batch collection, the
//! spreadsheet gateway and the time-windowed loop that drives them.

pub mod batch_collector;
pub mod errors;
pub mod spreadsheet_gateway;
pub mod status_fetcher;
pub mod sync_loop;

// Re-export commonly used items
pub use batch_collector::{BatchCollector, BatchProgress};
pub use errors::{SyncError, SyncResult};
pub use spreadsheet_gateway::{SpreadsheetGateway, build_batch_update_body};
pub use status_fetcher::StatusFetcher;
pub use sync_loop::{SyncLoop, SyncSettings, SyncState};
