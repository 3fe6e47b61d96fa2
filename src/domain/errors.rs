//! Error types for the two external collaborators and for range notation.

use thiserror::Error;

/// Failures talking to the reporting portal.
///
/// Request failures never abort a cycle: the fetcher turns them into absent
/// records and the session manager only logs them. `Misconfigured` is only
/// raised while building the client and stops startup.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Portal request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Portal returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to read portal response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Portal client misconfigured: {message}")]
    Misconfigured { message: String },
}

/// Failures talking to the spreadsheet backend. Always fatal for the loop.
#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Spreadsheet request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Spreadsheet backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Spreadsheet access token unavailable: {0}")]
    Token(String),

    #[error("Invalid spreadsheet endpoint: {0}")]
    InvalidUrl(String),

    #[error("Unexpected spreadsheet response: {0}")]
    Decode(String),
}

/// Malformed A1 notation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Range is empty")]
    Empty,

    #[error("Range '{0}' has an empty sheet name")]
    MissingSheetName(String),

    #[error("Range '{range}' contains invalid cell reference '{cell}'")]
    InvalidCell { range: String, cell: String },
}
