//! Google Sheets v4 REST backend
//!
//! Implements [`SpreadsheetBackend`] with `reqwest` and a bearer token.
//! Obtaining and refreshing the OAuth token is somebody else's job: the
//! client reads either a literal token or a token file that an external
//! helper keeps current.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::domain::errors::SheetsError;
use crate::domain::services::{BatchUpdateValuesRequest, SpreadsheetBackend, ValueRange};
use crate::domain::sheet_range::{SheetRange, ValueInputOption};
use crate::infrastructure::config::SheetsConfig;

/// Where the bearer token comes from.
#[derive(Clone)]
pub enum AccessTokenSource {
    Static(String),
    /// Re-read before every request so a refresher can rotate it.
    File(PathBuf),
}

impl std::fmt::Debug for AccessTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl AccessTokenSource {
    /// Literal token wins over the token file.
    #[must_use]
    pub fn from_config(config: &SheetsConfig) -> Option<Self> {
        config
            .access_token
            .clone()
            .map(Self::Static)
            .or_else(|| config.token_file.clone().map(Self::File))
    }

    pub async fn token(&self) -> Result<String, SheetsError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::File(path) => read_token_file(path).await,
        }
    }
}

/// Accepts `{"token": ...}` (google-auth `to_json()`) or `{"access_token": ...}`.
async fn read_token_file(path: &Path) -> Result<String, SheetsError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SheetsError::Token(format!("cannot read {}: {e}", path.display())))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| SheetsError::Token(format!("{} is not JSON: {e}", path.display())))?;

    ["token", "access_token"]
        .iter()
        .find_map(|key| json.get(*key).and_then(serde_json::Value::as_str))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SheetsError::Token(format!("{} holds no access token", path.display())))
}

/// Spreadsheet backend speaking the Sheets v4 `values` API
pub struct GoogleSheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    token: AccessTokenSource,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let token = AccessTokenSource::from_config(config).ok_or_else(|| {
            SheetsError::Token("neither access_token nor token_file is configured".to_string())
        })?;
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| SheetsError::InvalidUrl(format!("{}: {e}", config.api_base_url)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        info!("Spreadsheet backend ready for {}", config.spreadsheet_id);
        Ok(Self {
            client,
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            token,
        })
    }

    /// `{base}/{spreadsheet_id}/{segments...}` with each segment escaped.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, SheetsError> {
        let token = self.token.token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, SheetsError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateQuery {
    value_input_option: ValueInputOption,
}

#[async_trait]
impl SpreadsheetBackend for GoogleSheetsClient {
    async fn values_get(&self, range: &SheetRange) -> Result<ValueRange, SheetsError> {
        let url = self.endpoint(&["values", range.as_str()])?;
        debug!("values.get {}", range);

        let response = Self::send(self.request(Method::GET, url).await?).await?;
        response
            .json::<ValueRange>()
            .await
            .map_err(|e| SheetsError::Decode(format!("values.get {range}: {e}")))
    }

    async fn values_update(
        &self,
        range: &SheetRange,
        option: ValueInputOption,
        body: &ValueRange,
    ) -> Result<(), SheetsError> {
        let url = self.endpoint(&["values", range.as_str()])?;
        debug!("values.update {} ({})", range, option.as_str());

        let request = self
            .request(Method::PUT, url)
            .await?
            .query(&UpdateQuery {
                value_input_option: option,
            })
            .json(body);
        Self::send(request).await?;
        Ok(())
    }

    async fn values_batch_update(&self, body: &BatchUpdateValuesRequest) -> Result<(), SheetsError> {
        let url = self.endpoint(&["values:batchUpdate"])?;
        debug!(
            "values.batchUpdate {} range(s) ({})",
            body.data.len(),
            body.value_input_option.as_str()
        );

        let request = self.request(Method::POST, url).await?.json(body);
        Self::send(request).await?;
        Ok(())
    }
}
