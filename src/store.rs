use crate::labels::Label;
use crate::tasks::Task;
use chrono::{NaiveDate, TimeZone};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Tasks of the currently selected label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard {
    pub label_id: Option<String>,
    pub tasks: Vec<Task>,
}

/// Observable in-memory state: labels, the task board and the last sync error.
///
/// Clones share the same state. Readers take owned snapshots or subscribe; every write
/// goes through one of the methods below and notifies subscribers.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    labels: watch::Sender<Vec<Label>>,
    tasks: watch::Sender<TaskBoard>,
    error: watch::Sender<Option<String>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                labels: watch::Sender::new(Vec::new()),
                tasks: watch::Sender::new(TaskBoard::default()),
                error: watch::Sender::new(None),
            }),
        }
    }

    pub fn labels(&self) -> Vec<Label> {
        self.inner.labels.borrow().clone()
    }

    pub fn tasks(&self) -> TaskBoard {
        self.inner.tasks.borrow().clone()
    }

    #[allow(dead_code)] // Read by front ends; the CLI prints the returned error instead
    pub fn error(&self) -> Option<String> {
        self.inner.error.borrow().clone()
    }

    pub fn subscribe_tasks(&self) -> watch::Receiver<TaskBoard> {
        self.inner.tasks.subscribe()
    }

    pub fn publish_labels(&self, labels: Vec<Label>) {
        self.inner.labels.send_replace(labels);
    }

    /// Select a label and drop whatever tasks were shown before.
    pub fn begin_tasks(&self, label_id: &str) {
        self.inner.tasks.send_replace(TaskBoard {
            label_id: Some(label_id.to_string()),
            tasks: Vec::new(),
        });
    }

    /// Replace the board's tasks. Ignored unless `label_id` is still the selected label.
    pub fn publish_tasks(&self, label_id: &str, tasks: Vec<Task>) -> bool {
        let mut tasks = Some(tasks);
        self.inner.tasks.send_if_modified(|board| {
            if board.label_id.as_deref() != Some(label_id) {
                log::debug!("dropping tasks for deselected label {}", label_id);
                return false;
            }
            board.tasks = tasks.take().unwrap_or_default();
            true
        })
    }

    /// Fill in a task's summary if it has none yet. Ignored unless `label_id` is still
    /// the selected label and the task is on the board.
    pub fn attach_summary(&self, label_id: &str, task_id: &str, summary: String) -> bool {
        let mut summary = Some(summary);
        self.inner.tasks.send_if_modified(|board| {
            if board.label_id.as_deref() != Some(label_id) {
                log::debug!("dropping summary of {} for deselected label {}", task_id, label_id);
                return false;
            }
            match board.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) if task.ai_summary.is_none() => {
                    task.ai_summary = summary.take();
                    true
                }
                _ => false,
            }
        })
    }

    #[allow(dead_code)] // Completion is toggled by front ends that keep a board alive
    pub fn set_completed(&self, task_id: &str, completed: bool) -> bool {
        self.inner.tasks.send_if_modified(|board| {
            match board.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) if task.completed != completed => {
                    task.completed = completed;
                    true
                }
                _ => false,
            }
        })
    }

    pub fn report_error(&self, message: String) {
        self.inner.error.send_replace(Some(message));
    }

    pub fn clear_error(&self) {
        self.inner.error.send_if_modified(|error| error.take().is_some());
    }

    /// Forget everything, as on sign-out.
    #[allow(dead_code)] // The CLI holds no session across runs
    pub fn reset(&self) {
        self.inner.labels.send_replace(Vec::new());
        self.inner.tasks.send_replace(TaskBoard::default());
        self.clear_error();
    }

    /// Tasks created on `day` as seen in `tz`, in board order.
    pub fn tasks_on<Tz: TimeZone>(&self, day: NaiveDate, tz: &Tz) -> Vec<Task> {
        self.inner
            .tasks
            .borrow()
            .tasks
            .iter()
            .filter(|t| t.created_at.with_timezone(tz).date_naive() == day)
            .cloned()
            .collect()
    }

    /// Number of tasks per calendar day in `tz`.
    pub fn task_counts<Tz: TimeZone>(&self, tz: &Tz) -> BTreeMap<NaiveDate, usize> {
        let mut counts = BTreeMap::new();
        for task in &self.inner.tasks.borrow().tasks {
            *counts
                .entry(task.created_at.with_timezone(tz).date_naive())
                .or_insert(0) += 1;
        }
        counts
    }
}
