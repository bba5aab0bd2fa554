pub mod gmail;

use crate::body::DocumentPart;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub const NO_SUBJECT: &str = "no subject";
pub const NO_SENDER: &str = "no sender";

/// A user-created label as listed by the mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRef {
    pub id: String,
    pub name: String,
}

/// The headers and body tree of one message.
#[derive(Debug, Clone)]
pub struct MessageDetail {
    pub subject: String,
    pub sender: String,
    pub date_header: Option<String>,
    pub root: DocumentPart,
}

/// Read-only view of a remote mailbox.
///
/// `Ok(None)` and empty lists are normal answers; errors are left for the sync layer to
/// degrade per item.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// User-created labels only, in server order.
    async fn list_labels(&self) -> Result<Vec<LabelRef>>;
    /// Date of the newest message carrying the label, `None` for an empty label or a
    /// message without a parseable Date header.
    async fn latest_message_date(&self, label_id: &str) -> Result<Option<DateTime<Utc>>>;
    /// Message ids newest-first, at most `limit`.
    async fn list_message_ids(&self, label_id: &str, limit: u32) -> Result<Vec<String>>;
    async fn get_message_detail(&self, id: &str) -> Result<Option<MessageDetail>>;
}

const SYSTEM_LABELS: &[&str] = &[
    "INBOX",
    "SENT",
    "DRAFT",
    "SPAM",
    "TRASH",
    "UNREAD",
    "STARRED",
    "IMPORTANT",
    "CATEGORY_PERSONAL",
    "CATEGORY_SOCIAL",
    "CATEGORY_PROMOTIONS",
    "CATEGORY_UPDATES",
    "CATEGORY_FORUMS",
    "YELLOW_STAR",
    "BLUE_STAR",
    "RED_STAR",
    "ORANGE_STAR",
    "GREEN_STAR",
    "PURPLE_STAR",
    "CHAT",
    "NOTES",
];

pub fn is_system_label(id: &str) -> bool {
    SYSTEM_LABELS.contains(&id)
}
