//! Batch collection across the identifier list
//!
//! Identifiers are fetched strictly one after another. A failed fetch still
//! produces an (absent) entry, so the result table always lines up row for
//! row with the identifiers it was built from.

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::application::status_fetcher::StatusFetcher;
use crate::domain::entities::{EntityIdentifier, ResultTable};
use crate::domain::services::PortalSession;

/// Advisory progress of a running collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// 1-based index of the identifier just fetched
    pub current: usize,
    pub total: usize,
    pub identifier: Option<EntityIdentifier>,
}

pub struct BatchCollector {
    fetcher: StatusFetcher,
    progress: Option<watch::Sender<BatchProgress>>,
}

impl BatchCollector {
    #[must_use]
    pub const fn new(fetcher: StatusFetcher) -> Self {
        Self {
            fetcher,
            progress: None,
        }
    }

    /// Publish per-entity progress on a watch channel.
    #[must_use]
    pub fn with_progress(mut self, sender: watch::Sender<BatchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Subscribe to progress updates, creating the channel on first use.
    pub fn subscribe(&mut self) -> watch::Receiver<BatchProgress> {
        self.progress
            .get_or_insert_with(|| watch::channel(BatchProgress::default()).0)
            .subscribe()
    }

    /// Fetch every identifier in order; one table entry per identifier.
    pub async fn collect_all(
        &self,
        session: &dyn PortalSession,
        identifiers: &[EntityIdentifier],
    ) -> ResultTable {
        let total = identifiers.len();
        let mut table = ResultTable::with_capacity(total);

        for (index, identifier) in identifiers.iter().enumerate() {
            let record = self.fetcher.fetch(session, identifier).await;
            table.insert(identifier.clone(), record);

            let current = index + 1;
            info!(%identifier, current, total, "working on {}, {}/{}", identifier, current, total);
            if let Some(sender) = &self.progress {
                sender.send_replace(BatchProgress {
                    current,
                    total,
                    identifier: Some(identifier.clone()),
                });
            }
        }

        let absent = table.absent_count();
        if absent > 0 {
            info!("Collected {} statuses, {} without data", total, absent);
        } else {
            info!("Collected {} statuses", total);
        }
        table
    }
}
