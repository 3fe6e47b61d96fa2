//! Per-entity status fetch
//!
//! One authenticated GET, one parse, one [`StatusRecord`]. Every portal-side
//! failure is logged and collapses to an absent record so the caller's batch
//! keeps going.

use tracing::{debug, warn};

use crate::domain::entities::{EntityIdentifier, StatusRecord};
use crate::domain::services::PortalSession;
use crate::infrastructure::config::{ID_PLACEHOLDER, PortalConfig};
use crate::infrastructure::html_parser::UploadReportParser;

pub struct StatusFetcher {
    url_template: String,
    parser: UploadReportParser,
}

impl StatusFetcher {
    #[must_use]
    pub fn new(url_template: impl Into<String>, parser: UploadReportParser) -> Self {
        Self {
            url_template: url_template.into(),
            parser,
        }
    }

    #[must_use]
    pub fn from_config(config: &PortalConfig, parser: UploadReportParser) -> Self {
        Self::new(config.status_url_template.clone(), parser)
    }

    /// Status page URL for `identifier`, with the identifier form-encoded.
    #[must_use]
    pub fn status_url(&self, identifier: &EntityIdentifier) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(identifier.as_str().as_bytes()).collect();
        self.url_template.replace(ID_PLACEHOLDER, &encoded)
    }

    /// Fetch and decode one entity's status. Never fails.
    pub async fn fetch(&self, session: &dyn PortalSession, identifier: &EntityIdentifier) -> StatusRecord {
        let url = self.status_url(identifier);

        let body = match session.get_page(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%identifier, "Status fetch failed: {}", e);
                return StatusRecord::absent();
            }
        };

        match self.parser.parse(&body) {
            Ok(record) => {
                debug!(%identifier, ?record, "Status decoded");
                record
            }
            Err(e) => {
                warn!(%identifier, "Unexpected status page shape: {}", e);
                StatusRecord::absent()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakePortal, full_page};

    fn fetcher() -> StatusFetcher {
        StatusFetcher::new(
            "https://portal.test/edit.php?id={id}&form=oo2",
            UploadReportParser::new().unwrap(),
        )
    }

    #[test]
    fn url_substitutes_and_encodes_identifier() {
        let fetcher = fetcher();
        assert_eq!(
            fetcher.status_url(&"4521".into()),
            "https://portal.test/edit.php?id=4521&form=oo2"
        );
        assert_eq!(
            fetcher.status_url(&"a b&c".into()),
            "https://portal.test/edit.php?id=a+b%26c&form=oo2"
        );
    }

    #[tokio::test]
    async fn full_page_yields_status_then_date() {
        let fetcher = fetcher();
        let portal = FakePortal::default().with_page(
            fetcher.status_url(&"A".into()),
            full_page("ok", "01.10.2026"),
        );

        let record = fetcher.fetch(&portal, &"A".into()).await;
        assert_eq!(record.status.as_deref(), Some("ok"));
        assert_eq!(record.upload_date.as_deref(), Some("01.10.2026"));
    }

    #[tokio::test]
    async fn empty_page_yields_absent_record() {
        let fetcher = fetcher();
        let portal = FakePortal::default()
            .with_page(fetcher.status_url(&"B".into()), "<html><body></body></html>");

        assert!(fetcher.fetch(&portal, &"B".into()).await.is_absent());
    }

    #[tokio::test]
    async fn transport_error_yields_absent_record() {
        let portal = FakePortal::default();
        assert!(fetcher().fetch(&portal, &"missing".into()).await.is_absent());
        assert_eq!(portal.requests().len(), 1);
    }

    #[tokio::test]
    async fn short_table_yields_absent_record() {
        let fetcher = fetcher();
        let portal = FakePortal::default().with_page(
            fetcher.status_url(&"C".into()),
            "<table><tr><td>only</td><td>two</td></tr></table>",
        );

        assert!(fetcher.fetch(&portal, &"C".into()).await.is_absent());
    }
}
