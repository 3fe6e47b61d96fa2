//! Errors that end the sync loop.

use thiserror::Error;

use crate::domain::errors::SheetsError;
use crate::infrastructure::config::ConfigError;

/// Everything here is fatal: the loop stops and the process exits.
/// Portal-side failures never reach this type.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read identifiers from {range}: {source}")]
    Identifiers {
        range: String,
        #[source]
        source: SheetsError,
    },

    #[error("Failed to write {what} to {range}: {source}")]
    SheetWrite {
        what: &'static str,
        range: String,
        #[source]
        source: SheetsError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type SyncResult<T> = Result<T, SyncError>;
