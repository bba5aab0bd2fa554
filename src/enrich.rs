use crate::store::Store;
use crate::summarizer::{Detail, Summarizer};
use crate::tasks::Task;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Only the newest tasks get a summary.
pub const SUMMARIZED_TASKS: usize = 3;

/// Attaches AI summaries to the newest tasks of a published board.
#[derive(Clone)]
pub struct SummaryEnricher {
    summarizer: Arc<dyn Summarizer>,
    store: Store,
}

impl SummaryEnricher {
    pub fn new(summarizer: Arc<dyn Summarizer>, store: Store) -> Self {
        Self { summarizer, store }
    }

    /// Run `enrich` in the background. The handle resolves to the number of summaries attached.
    pub fn spawn(&self, label_id: &str, tasks: &[Task]) -> JoinHandle<usize> {
        let enricher = self.clone();
        let label_id = label_id.to_string();
        let tasks: Vec<Task> = tasks.iter().take(SUMMARIZED_TASKS).cloned().collect();
        tokio::spawn(async move { enricher.enrich(&label_id, &tasks).await })
    }

    /// Summarize the first `SUMMARIZED_TASKS` of `tasks` (already sorted newest first)
    /// concurrently, attaching each summary to the board as soon as it arrives.
    ///
    /// The newest task gets the full template, the others the overview only. Failed
    /// calls leave the task without a summary.
    pub async fn enrich(&self, label_id: &str, tasks: &[Task]) -> usize {
        let selected = &tasks[..tasks.len().min(SUMMARIZED_TASKS)];
        log::info!("summarizing {} tasks for label {}", selected.len(), label_id);

        let mut pending: FuturesUnordered<_> = selected
            .iter()
            .enumerate()
            .map(|(index, task)| async move {
                let detail = if index == 0 {
                    Detail::Full
                } else {
                    Detail::Overview
                };
                let result = self
                    .summarizer
                    .summarize(&task.title, &task.body, &task.sender, detail)
                    .await;
                (task, result)
            })
            .collect();

        let mut attached = 0;
        while let Some((task, result)) = pending.next().await {
            match result {
                Ok(summary) => {
                    if self.store.attach_summary(label_id, &task.id, summary) {
                        attached += 1;
                    }
                }
                Err(e) => log::warn!("couldn't summarize '{}': {}", task.title, e),
            }
        }
        attached
    }
}
