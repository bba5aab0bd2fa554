use crate::providers::{LabelRef, MailboxProvider};
use crate::store::Store;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub latest_message_at: Option<DateTime<Utc>>,
}

pub struct LabelSync {
    mailbox: Arc<dyn MailboxProvider>,
    store: Store,
}

impl LabelSync {
    pub fn new(mailbox: Arc<dyn MailboxProvider>, store: Store) -> Self {
        Self { mailbox, store }
    }

    /// Fetch user labels, date each one concurrently and publish them newest first.
    pub async fn sync(&self) -> Result<Vec<Label>> {
        let refs = match self.mailbox.list_labels().await {
            Ok(refs) => refs,
            Err(e) => {
                self.store.report_error(format!("Failed to fetch labels: {}", e));
                return Err(e).context("Failed to list labels");
            }
        };
        log::info!("fetched {} labels, dating latest messages", refs.len());

        let mut pending: FuturesUnordered<_> = refs
            .into_iter()
            .map(|label| self.with_latest_date(label))
            .collect();

        let mut labels = Vec::new();
        while let Some(label) = pending.next().await {
            labels.push(label);
        }
        sort_newest_first(&mut labels);

        self.store.publish_labels(labels.clone());
        self.store.clear_error();
        Ok(labels)
    }

    async fn with_latest_date(&self, label: LabelRef) -> Label {
        let latest_message_at = match self.mailbox.latest_message_date(&label.id).await {
            Ok(date) => date,
            Err(e) => {
                log::warn!("couldn't date label {}: {}", label.name, e);
                None
            }
        };

        Label {
            id: label.id,
            name: label.name,
            latest_message_at,
        }
    }
}

/// Descending by latest message; undated labels go last.
pub fn sort_newest_first(labels: &mut [Label]) {
    labels.sort_by(|a, b| b.latest_message_at.cmp(&a.latest_message_at));
}
