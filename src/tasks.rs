use crate::body::extract_body;
use crate::date::parse_date;
use crate::enrich::SummaryEnricher;
use crate::providers::{MailboxProvider, MessageDetail};
use crate::store::Store;
use crate::summarizer::Summarizer;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Messages fetched per label.
pub const MESSAGE_LIMIT: u32 = 20;

pub const NO_CONTENT: &str = "no content";

/// A work item derived from one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// The source message id.
    pub id: String,
    pub title: String,
    pub body: String,
    pub sender: String,
    pub created_at: DateTime<Utc>,
    pub label_name: String,
    pub completed: bool,
    pub ai_summary: Option<String>,
}

impl Task {
    /// Build a task from message headers and body. An unparseable Date header falls back to `now`.
    pub fn from_message(id: String, detail: &MessageDetail, label_name: &str, now: DateTime<Utc>) -> Self {
        let created_at = detail
            .date_header
            .as_deref()
            .and_then(parse_date)
            .unwrap_or(now);

        Task {
            id,
            title: detail.subject.clone(),
            body: extract_body(&detail.root).unwrap_or_else(|| NO_CONTENT.to_string()),
            sender: detail.sender.clone(),
            created_at,
            label_name: label_name.to_string(),
            completed: false,
            ai_summary: None,
        }
    }
}

/// Result of a task sync: what was published, plus the background summary pass when the
/// label was still selected at publish time.
pub struct Synced {
    pub tasks: Vec<Task>,
    pub enrichment: Option<JoinHandle<usize>>,
}

pub struct TaskSync {
    mailbox: Arc<dyn MailboxProvider>,
    store: Store,
    enricher: SummaryEnricher,
}

impl TaskSync {
    pub fn new(mailbox: Arc<dyn MailboxProvider>, summarizer: Arc<dyn Summarizer>, store: Store) -> Self {
        let enricher = SummaryEnricher::new(summarizer, store.clone());
        Self {
            mailbox,
            store,
            enricher,
        }
    }

    /// Select `label_id`, load its newest messages one at a time, publish them as tasks
    /// newest first and start summarizing.
    pub async fn sync(&self, label_id: &str) -> Result<Synced> {
        self.store.begin_tasks(label_id);

        let ids = match self.mailbox.list_message_ids(label_id, MESSAGE_LIMIT).await {
            Ok(ids) => ids,
            Err(e) => {
                self.store.report_error(format!("Failed to fetch emails: {}", e));
                return Err(e).with_context(|| format!("Failed to list messages of {}", label_id));
            }
        };
        let ids = distinct(ids);
        log::info!("found {} messages for label {}", ids.len(), label_id);

        let label_name = self
            .store
            .labels()
            .into_iter()
            .find(|l| l.id == label_id)
            .map(|l| l.name)
            .unwrap_or_else(|| label_id.to_string());

        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            match self.mailbox.get_message_detail(&id).await {
                Ok(Some(detail)) => {
                    tasks.push(Task::from_message(id, &detail, &label_name, Utc::now()));
                }
                Ok(None) => log::debug!("message {} has no payload, skipping", id),
                Err(e) => log::warn!("couldn't fetch message {}: {}", id, e),
            }
        }
        sort_newest_first(&mut tasks);

        if !self.store.publish_tasks(label_id, tasks.clone()) {
            return Ok(Synced {
                tasks,
                enrichment: None,
            });
        }
        self.store.clear_error();

        let enrichment = self.enricher.spawn(label_id, &tasks);
        Ok(Synced {
            tasks,
            enrichment: Some(enrichment),
        })
    }
}

/// Keep the first occurrence of each id, capped at `MESSAGE_LIMIT`.
fn distinct(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .take(MESSAGE_LIMIT as usize)
        .collect()
}

pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::DocumentPart;
    use crate::error::{Error, Result as ClientResult};
    use crate::labels::Label;
    use crate::providers::LabelRef;
    use crate::summarizer::Detail;
    use async_trait::async_trait;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeMailbox {
        ids: Option<Vec<String>>,
        messages: HashMap<String, MessageDetail>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        switch_to: Option<(Store, String)>,
    }

    impl FakeMailbox {
        fn new(ids: &[&str], messages: Vec<(&str, MessageDetail)>) -> Self {
            Self {
                ids: Some(ids.iter().map(|s| s.to_string()).collect()),
                messages: messages.into_iter().map(|(id, m)| (id.to_string(), m)).collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                switch_to: None,
            }
        }
    }

    #[async_trait]
    impl MailboxProvider for FakeMailbox {
        async fn list_labels(&self) -> ClientResult<Vec<LabelRef>> {
            Ok(Vec::new())
        }

        async fn latest_message_date(&self, _label_id: &str) -> ClientResult<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn list_message_ids(&self, _label_id: &str, _limit: u32) -> ClientResult<Vec<String>> {
            self.ids.clone().ok_or(Error::Upstream { status: 500 })
        }

        async fn get_message_detail(&self, id: &str) -> ClientResult<Option<MessageDetail>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some((store, label_id)) = &self.switch_to {
                store.begin_tasks(label_id);
            }
            self.messages
                .get(id)
                .cloned()
                .map(Some)
                .ok_or_else(|| Error::Parse(format!("no message {}", id)))
        }
    }

    struct EchoSummarizer;

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        async fn summarize(&self, title: &str, _body: &str, _sender: &str, _detail: Detail) -> ClientResult<String> {
            Ok(format!("summary of {}", title))
        }
    }

    fn message(subject: &str, date: Option<&str>, text: &str) -> MessageDetail {
        MessageDetail {
            subject: subject.to_string(),
            sender: "lee@example.com".to_string(),
            date_header: date.map(str::to_string),
            root: DocumentPart::Leaf {
                mime_type: "text/plain".to_string(),
                data: URL_SAFE_NO_PAD.encode(text),
            },
        }
    }

    fn day(d: u32) -> String {
        Utc.with_ymd_and_hms(2024, 5, d, 9, 0, 0)
            .unwrap()
            .format("%a, %d %b %Y %H:%M:%S %z")
            .to_string()
    }

    fn store_with_label() -> Store {
        let store = Store::new();
        store.publish_labels(vec![Label {
            id: "L1".to_string(),
            name: "Work".to_string(),
            latest_message_at: None,
        }]);
        store
    }

    #[test]
    fn test_garbage_date_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let task = Task::from_message("m1".to_string(), &message("s", Some("garbage"), "b"), "Work", now);
        assert_eq!(task.created_at, now);
        assert_eq!(task.body, "b");
        assert!(!task.completed);
        assert_eq!(task.ai_summary, None);
    }

    #[test]
    fn test_missing_body_gets_placeholder() {
        let mut detail = message("s", None, "");
        detail.root = DocumentPart::Multipart {
            mime_type: "multipart/mixed".to_string(),
            parts: vec![],
        };
        let task = Task::from_message("m1".to_string(), &detail, "Work", Utc::now());
        assert_eq!(task.body, NO_CONTENT);
    }

    #[tokio::test]
    async fn test_sync_sorts_skips_failures_and_enriches() {
        let (d3, d7, d5) = (day(3), day(7), day(5));
        let mailbox = FakeMailbox::new(
            &["m3", "m7", "missing", "m5", "m7"],
            vec![
                ("m3", message("third", Some(&d3), "c")),
                ("m7", message("seventh", Some(&d7), "a")),
                ("m5", message("fifth", Some(&d5), "b")),
            ],
        );
        let mailbox = Arc::new(mailbox);
        let store = store_with_label();
        let sync = TaskSync::new(mailbox.clone(), Arc::new(EchoSummarizer), store.clone());

        let synced = sync.sync("L1").await.unwrap();
        let titles: Vec<_> = synced.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["seventh", "fifth", "third"]);
        assert!(synced.tasks.iter().all(|t| t.label_name == "Work"));
        assert_eq!(mailbox.max_in_flight.load(Ordering::SeqCst), 1);

        assert_eq!(synced.enrichment.unwrap().await.unwrap(), 3);
        let board = store.tasks();
        assert_eq!(board.label_id.as_deref(), Some("L1"));
        assert_eq!(board.tasks[0].ai_summary.as_deref(), Some("summary of seventh"));
    }

    #[tokio::test]
    async fn test_sync_caps_at_message_limit() {
        let ids: Vec<String> = (0..25).map(|i| format!("m{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let messages = ids
            .iter()
            .map(|id| (id.as_str(), message(id, None, "x")))
            .collect();
        let sync = TaskSync::new(
            Arc::new(FakeMailbox::new(&id_refs, messages)),
            Arc::new(EchoSummarizer),
            store_with_label(),
        );

        let synced = sync.sync("L1").await.unwrap();
        assert_eq!(synced.tasks.len(), MESSAGE_LIMIT as usize);
        for pair in synced.tasks.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_unknown_label_uses_id_as_name() {
        let mailbox = FakeMailbox::new(&["m1"], vec![("m1", message("s", None, "b"))]);
        let sync = TaskSync::new(Arc::new(mailbox), Arc::new(EchoSummarizer), Store::new());

        let synced = sync.sync("Label_9").await.unwrap();
        assert_eq!(synced.tasks[0].label_name, "Label_9");
    }

    #[tokio::test]
    async fn test_list_failure_clears_board_and_reports() {
        let store = store_with_label();
        store.begin_tasks("L0");
        store.publish_tasks("L0", vec![Task::from_message("old".to_string(), &message("s", None, "b"), "x", Utc::now())]);

        let mut mailbox = FakeMailbox::new(&[], Vec::new());
        mailbox.ids = None;
        let sync = TaskSync::new(Arc::new(mailbox), Arc::new(EchoSummarizer), store.clone());

        assert!(sync.sync("L1").await.is_err());
        let board = store.tasks();
        assert_eq!(board.label_id.as_deref(), Some("L1"));
        assert!(board.tasks.is_empty());
        assert!(store.error().unwrap().contains("Failed to fetch emails"));
    }

    #[tokio::test]
    async fn test_label_switch_mid_sync_discards_results() {
        let store = store_with_label();
        let mut mailbox = FakeMailbox::new(&["m1"], vec![("m1", message("s", None, "b"))]);
        mailbox.switch_to = Some((store.clone(), "L2".to_string()));
        let sync = TaskSync::new(Arc::new(mailbox), Arc::new(EchoSummarizer), store.clone());

        let synced = sync.sync("L1").await.unwrap();
        assert_eq!(synced.tasks.len(), 1);
        assert!(synced.enrichment.is_none());

        let board = store.tasks();
        assert_eq!(board.label_id.as_deref(), Some("L2"));
        assert!(board.tasks.is_empty());
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(distinct(ids), vec!["b", "a"]);
    }
}
