//! Authenticated portal session
//!
//! Logging in is best effort: a rejected or unreachable login is logged and
//! the session is handed back anyway. Whatever cookies the attempt left are
//! what later requests run with.

use async_trait::async_trait;
use std::fmt;
use tracing::{error, info, warn};

use crate::domain::errors::PortalError;
use crate::domain::services::PortalSession;
use crate::infrastructure::config::PortalConfig;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};

/// Login name and password posted to the portal's login form.
#[derive(Clone)]
pub struct PortalCredentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how the login form is submitted.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub url: String,
    pub login_field: String,
    pub password_field: String,
}

/// Cookie-jar session over [`HttpClient`].
pub struct HttpPortalSession {
    http: HttpClient,
    form: LoginForm,
    credentials: PortalCredentials,
}

impl HttpPortalSession {
    /// Build the HTTP client from `config` and log in once.
    pub async fn open_with_config(config: &PortalConfig) -> Result<Self, PortalError> {
        let http = HttpClient::new(HttpClientConfig::from_portal_config(config))?;
        let form = LoginForm {
            url: config.login_url.clone(),
            login_field: config.login_field.clone(),
            password_field: config.password_field.clone(),
        };
        let credentials = PortalCredentials {
            login: config.login.clone(),
            password: config.password.clone(),
        };
        Ok(Self::open(http, form, credentials).await)
    }

    /// Log in and return the session whether or not the login worked.
    pub async fn open(http: HttpClient, form: LoginForm, credentials: PortalCredentials) -> Self {
        let session = Self {
            http,
            form,
            credentials,
        };

        match session.login().await {
            Ok(()) => info!("Portal session opened for '{}'", session.credentials.login),
            Err(e) => error!(
                "Portal login failed, continuing with unauthenticated session: {}",
                e
            ),
        }

        session
    }

    async fn login(&self) -> Result<(), PortalError> {
        let form = [
            (self.form.login_field.as_str(), self.credentials.login.as_str()),
            (
                self.form.password_field.as_str(),
                self.credentials.password.as_str(),
            ),
        ];
        self.http.post_form(&self.form.url, &form).await
    }
}

#[async_trait]
impl PortalSession for HttpPortalSession {
    async fn get_page(&self, url: &str) -> Result<String, PortalError> {
        self.http.get_text(url).await
    }

    async fn reauthenticate(&self) -> Result<(), PortalError> {
        warn!("Re-authenticating portal session");
        self.login().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_is_redacted() {
        let credentials = PortalCredentials {
            login: "school-17".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("school-17"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn unreachable_login_still_yields_a_session() {
        let config = PortalConfig {
            // Reserved port on loopback: the connection is refused immediately.
            login_url: "http://127.0.0.1:9/".to_string(),
            timeout_seconds: 2,
            max_requests_per_second: 50,
            ..PortalConfig::default()
        };

        let session = HttpPortalSession::open_with_config(&config).await;
        assert!(session.is_ok());
    }
}
