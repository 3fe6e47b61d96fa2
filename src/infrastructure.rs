//! Infrastructure layer for portal access, spreadsheet access and runtime plumbing
//!
//! This module provides the HTTP client and session for the reporting
//! portal, HTML decoding of its report pages, the Google Sheets backend,
//! the wall clock, configuration loading and logging.

pub mod config;
pub mod html_parser;
pub mod http_client;
pub mod logging;
pub mod parsing_error;
pub mod portal_session;
pub mod sheets_client;
pub mod system_clock;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, SheetRanges};
pub use html_parser::{UploadReportParser, UploadReportSchema};
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging_with_config};
pub use parsing_error::{ParsingError, ParsingResult};
pub use portal_session::{HttpPortalSession, LoginForm, PortalCredentials};
pub use sheets_client::{AccessTokenSource, GoogleSheetsClient};
pub use system_clock::SystemClock;
