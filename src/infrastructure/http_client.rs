//! HTTP client for the reporting portal with rate limiting and a cookie jar
//!
//! Every portal request goes through one `reqwest` client whose cookie store
//! carries the login session, and through a token-bucket limiter so the
//! serial fetch loop never exceeds the configured request rate.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::errors::PortalError;
use crate::infrastructure::config::PortalConfig;

/// HTTP client configuration for portal access
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "org-status-sync/0.2".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 2,
            follow_redirects: true,
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn from_portal_config(portal: &PortalConfig) -> Self {
        Self {
            user_agent: portal.user_agent.clone(),
            timeout_seconds: portal.timeout_seconds,
            max_requests_per_second: portal.max_requests_per_second,
            follow_redirects: portal.follow_redirects,
        }
    }
}

/// Rate-limited HTTP client holding the portal cookie jar
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|e| PortalError::Misconfigured {
                message: format!("Invalid user agent '{}': {e}", config.user_agent),
            })?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| PortalError::Misconfigured {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        let quota = Quota::per_second(NonZeroU32::new(config.max_requests_per_second).ok_or_else(
            || PortalError::Misconfigured {
                message: "Rate limit must be greater than 0".to_string(),
            },
        )?);
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// GET a URL and return its body as text
    pub async fn get_text(&self, url: &str) -> Result<String, PortalError> {
        self.rate_limiter.until_ready().await;

        debug!("Fetching URL: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PortalError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|source| PortalError::Body {
            url: url.to_string(),
            source,
        })?;

        debug!("Fetched {} ({} chars)", url, text.len());
        Ok(text)
    }

    /// POST an urlencoded form; cookies set by the response are kept
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<(), PortalError> {
        self.rate_limiter.until_ready().await;

        info!("Posting form to {}", url);
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|source| PortalError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(())
    }

    /// Get the configuration
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
