//! Configuration infrastructure
//!
//! Loads the single immutable [`AppConfig`] the sync engine runs with.
//!
//! Sources are layered with the `config` crate, later ones winning:
//! 1. Built-in defaults (the production ranges, window and interval)
//! 2. An optional TOML file
//! 3. Environment variables prefixed `ORGSYNC_` (`__` separates sections,
//!    e.g. `ORGSYNC_PORTAL__PASSWORD`)

use chrono::NaiveTime;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::active_window::{ActiveWindow, parse_time_of_day};
use crate::domain::sheet_range::SheetRange;

/// Environment prefix for every override.
pub const ENV_PREFIX: &str = "ORGSYNC";
/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ORGSYNC_CONFIG";
/// Placeholder substituted with the entity identifier in the status URL.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub sheets: SheetsConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// Reporting portal endpoints, credentials and HTTP behaviour
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Login form target
    pub login_url: String,

    /// Status page URL; `{id}` is replaced with the entity identifier
    pub status_url_template: String,

    /// Form field carrying the login name
    pub login_field: String,

    /// Form field carrying the password
    pub password_field: String,

    pub login: String,

    pub password: String,

    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Upper bound on portal requests per second
    pub max_requests_per_second: u32,

    /// Follow HTTP redirects after login and on status pages
    pub follow_redirects: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: "https://cabinet.miccedu.ru/".to_string(),
            status_url_template: "https://cabinet.miccedu.ru/object/ajax/edit.php?id={id}&pid=35716&type=99&form=oo2&reqtype=supload&container=juploadtr&edulevel=2".to_string(),
            login_field: "login".to_string(),
            password_field: "pswrd".to_string(),
            login: String::new(),
            password: String::new(),
            user_agent: "org-status-sync/0.2".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 2,
            follow_redirects: true,
        }
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("login_url", &self.login_url)
            .field("status_url_template", &self.status_url_template)
            .field("login_field", &self.login_field)
            .field("password_field", &self.password_field)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_requests_per_second", &self.max_requests_per_second)
            .field("follow_redirects", &self.follow_redirects)
            .finish()
    }
}

/// Spreadsheet location, credentials and the four fixed ranges
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,

    pub api_base_url: String,

    /// Literal OAuth access token
    pub access_token: Option<String>,

    /// JSON token file maintained by an external OAuth helper
    pub token_file: Option<PathBuf>,

    pub timeout_seconds: u64,

    /// Source of the entity identifiers, read once at startup
    pub codes_range: String,

    pub status_range: String,

    pub date_range: String,

    /// Single cell receiving the "last update" stamp
    pub update_time_cell: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            api_base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            access_token: None,
            token_file: None,
            timeout_seconds: 30,
            codes_range: "Sheet1!A2:A163".to_string(),
            status_range: "Sheet1!H2:H163".to_string(),
            date_range: "Sheet1!G2:G163".to_string(),
            update_time_cell: "Sheet1!J3".to_string(),
        }
    }
}

impl fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("api_base_url", &self.api_base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("token_file", &self.token_file)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("codes_range", &self.codes_range)
            .field("status_range", &self.status_range)
            .field("date_range", &self.date_range)
            .field("update_time_cell", &self.update_time_cell)
            .finish()
    }
}

/// Parsed form of the four configured ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRanges {
    pub codes: SheetRange,
    pub status: SheetRange,
    pub date: SheetRange,
    pub update_time: SheetRange,
}

impl SheetsConfig {
    pub fn ranges(&self) -> Result<SheetRanges, ConfigError> {
        let parse = |name: &str, raw: &str| {
            SheetRange::parse(raw)
                .map_err(|e| ConfigError::validation(format!("sheets.{name}: {e}")))
        };

        let ranges = SheetRanges {
            codes: parse("codes_range", &self.codes_range)?,
            status: parse("status_range", &self.status_range)?,
            date: parse("date_range", &self.date_range)?,
            update_time: parse("update_time_cell", &self.update_time_cell)?,
        };

        if !ranges.update_time.is_single_cell() {
            return Err(ConfigError::validation(format!(
                "sheets.update_time_cell must name a single cell, got '{}'",
                self.update_time_cell
            )));
        }

        Ok(ranges)
    }
}

/// Polling schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Start of the active window, `HH:MM` local time (exclusive)
    pub window_start: String,

    /// End of the active window, `HH:MM` local time (exclusive)
    pub window_end: String,

    /// Pause after each completed cycle
    pub poll_interval_seconds: u64,

    /// Identifiers polled per cycle, taken from the front of the list
    pub batch_size: usize,

    /// Longest single sleep while waiting for the window to open
    pub max_idle_recheck_seconds: u64,

    /// `chrono` format of the update stamp
    pub timestamp_format: String,

    /// Re-login after this many consecutive empty results in one cycle
    pub reauth_after_consecutive_empty: Option<usize>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            window_start: "08:50".to_string(),
            window_end: "18:00".to_string(),
            poll_interval_seconds: 600,
            batch_size: 5,
            max_idle_recheck_seconds: 300,
            timestamp_format: "last update %d.%m.%Y, %H:%M".to_string(),
            reauth_after_consecutive_empty: None,
        }
    }
}

impl ScheduleConfig {
    pub fn active_window(&self) -> Result<ActiveWindow, ConfigError> {
        let parse = |name: &str, raw: &str| -> Result<NaiveTime, ConfigError> {
            parse_time_of_day(raw).map_err(|e| {
                ConfigError::validation(format!("schedule.{name} '{raw}' is not HH:MM: {e}"))
            })
        };
        let start = parse("window_start", &self.window_start)?;
        let end = parse("window_end", &self.window_end)?;

        ActiveWindow::new(start, end).ok_or_else(|| {
            ConfigError::validation(format!(
                "schedule.window_start ({start}) must be before schedule.window_end ({end})"
            ))
        })
    }

    /// The update-stamp format, rejected if `chrono` cannot render it.
    pub fn checked_timestamp_format(&self) -> Result<&str, ConfigError> {
        let format = self.timestamp_format.as_str();
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::validation(format!(
                "schedule.timestamp_format '{format}' is not a valid strftime format"
            )));
        }
        Ok(format)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    #[must_use]
    pub const fn max_idle_recheck(&self) -> Duration {
        Duration::from_secs(self.max_idle_recheck_seconds)
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for rolling log files; defaults to the platform data dir
    pub log_dir: Option<PathBuf>,

    /// File name prefix of the daily log files
    pub file_prefix: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: usize,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: None,
            file_prefix: "org-status-sync.log".to_string(),
            max_files: 14,
            module_filters: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (if any), then `ORGSYNC_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading overrides from `env` instead of the
    /// process environment when given.
    ///
    /// Override values stay strings until deserialization, so credentials
    /// such as `007123` keep their leading zeros.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.poll_interval_seconds == 0 {
            return Err(ConfigError::validation(
                "schedule.poll_interval_seconds must be greater than 0",
            ));
        }

        if self.schedule.batch_size == 0 {
            return Err(ConfigError::validation(
                "schedule.batch_size must be greater than 0",
            ));
        }

        if self.schedule.max_idle_recheck_seconds == 0 {
            return Err(ConfigError::validation(
                "schedule.max_idle_recheck_seconds must be greater than 0",
            ));
        }

        if self.schedule.reauth_after_consecutive_empty == Some(0) {
            return Err(ConfigError::validation(
                "schedule.reauth_after_consecutive_empty must be at least 1 when set",
            ));
        }

        self.schedule.active_window()?;

        self.schedule.checked_timestamp_format()?;

        if !self.portal.status_url_template.contains(ID_PLACEHOLDER) {
            return Err(ConfigError::validation(format!(
                "portal.status_url_template must contain {ID_PLACEHOLDER}"
            )));
        }

        for (name, raw) in [
            ("portal.login_url", &self.portal.login_url),
            ("portal.status_url_template", &self.portal.status_url_template),
            ("sheets.api_base_url", &self.sheets.api_base_url),
        ] {
            url::Url::parse(raw)
                .map_err(|e| ConfigError::validation(format!("{name} is not a valid URL: {e}")))?;
        }

        if self.portal.max_requests_per_second == 0 {
            return Err(ConfigError::validation(
                "portal.max_requests_per_second must be greater than 0",
            ));
        }

        if self.sheets.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::validation("sheets.spreadsheet_id is required"));
        }

        if self.sheets.access_token.is_none() && self.sheets.token_file.is_none() {
            return Err(ConfigError::validation(
                "one of sheets.access_token or sheets.token_file is required",
            ));
        }

        self.sheets.ranges()?;

        if self.portal.login.is_empty() || self.portal.password.is_empty() {
            warn!("Portal credentials are empty; status pages will likely come back without data");
        }

        Ok(())
    }
}

/// Pick the config file: explicit argument, then `ORGSYNC_CONFIG`, then
/// `config/default.toml`, then the platform config dir.
#[must_use]
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from("config/default.toml");
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("org-status-sync").join("config.toml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.sheets.spreadsheet_id = "sheet-123".to_string();
        config.sheets.access_token = Some("token".to_string());
        config.portal.login = "user".to_string();
        config.portal.password = "secret".to_string();
        config
    }

    #[test]
    fn defaults_match_production_layout() {
        let config = AppConfig::default();
        let ranges = config.sheets.ranges().unwrap();
        assert_eq!(ranges.codes.as_str(), "Sheet1!A2:A163");
        assert_eq!(ranges.status.as_str(), "Sheet1!H2:H163");
        assert_eq!(ranges.date.as_str(), "Sheet1!G2:G163");
        assert_eq!(ranges.update_time.as_str(), "Sheet1!J3");
        assert_eq!(config.schedule.poll_interval(), Duration::from_secs(600));
        assert_eq!(config.schedule.batch_size, 5);
        assert_eq!(config.portal.password_field, "pswrd");
    }

    #[test]
    fn default_requires_spreadsheet_and_token() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("spreadsheet_id"));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_bad_schedule() {
        let mut config = valid();
        config.schedule.window_start = "18:00".to_string();
        config.schedule.window_end = "08:50".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.schedule.poll_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.schedule.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.schedule.reauth_after_consecutive_empty = Some(0);
        assert!(config.validate().is_err());

        let mut config = valid();
        config.schedule.timestamp_format = "updated at %".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let mut config = valid();
        config.portal.status_url_template = "https://example.org/status".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_multi_cell_update_stamp() {
        let mut config = valid();
        config.sheets.update_time_cell = "Sheet1!J3:J4".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = valid();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("\"token\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn loads_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[sheets]
spreadsheet_id = "abc"
access_token = "tok"
status_range = "Data!H2:H10"

[schedule]
window_start = "09:00"
batch_size = 12
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.sheets.spreadsheet_id, "abc");
        assert_eq!(config.sheets.status_range, "Data!H2:H10");
        assert_eq!(config.sheets.date_range, "Sheet1!G2:G163");
        assert_eq!(config.schedule.batch_size, 12);
        assert_eq!(
            config.schedule.active_window().unwrap().start(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn env_overrides_keep_numeric_looking_credentials_verbatim() {
        let overrides = env(&[
            ("ORGSYNC_PORTAL__LOGIN", "007123"),
            ("ORGSYNC_PORTAL__PASSWORD", "0042"),
            ("ORGSYNC_SHEETS__SPREADSHEET_ID", "0001"),
            ("ORGSYNC_SHEETS__ACCESS_TOKEN", "true"),
        ]);

        let config = AppConfig::load_with_env(None, Some(overrides)).unwrap();
        assert_eq!(config.portal.login, "007123");
        assert_eq!(config.portal.password, "0042");
        assert_eq!(config.sheets.spreadsheet_id, "0001");
        assert_eq!(config.sheets.access_token.as_deref(), Some("true"));
    }

    #[test]
    fn env_overrides_still_fill_numeric_and_bool_fields() {
        let overrides = env(&[
            ("ORGSYNC_SHEETS__SPREADSHEET_ID", "abc"),
            ("ORGSYNC_SHEETS__ACCESS_TOKEN", "tok"),
            ("ORGSYNC_SCHEDULE__BATCH_SIZE", "12"),
            ("ORGSYNC_SCHEDULE__POLL_INTERVAL_SECONDS", "300"),
            ("ORGSYNC_SCHEDULE__REAUTH_AFTER_CONSECUTIVE_EMPTY", "4"),
            ("ORGSYNC_LOGGING__JSON_FORMAT", "true"),
        ]);

        let config = AppConfig::load_with_env(None, Some(overrides)).unwrap();
        assert_eq!(config.schedule.batch_size, 12);
        assert_eq!(config.schedule.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.schedule.reauth_after_consecutive_empty, Some(4));
        assert!(config.logging.json_format);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/org-status-sync.toml")));
        assert!(matches!(err, Err(ConfigError::FileLoad { .. })));
    }
}
