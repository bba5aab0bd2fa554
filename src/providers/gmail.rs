use super::{is_system_label, LabelRef, MailboxProvider, MessageDetail, NO_SENDER, NO_SUBJECT};
use crate::body::DocumentPart;
use crate::date::parse_date;
use crate::error::{check_status, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Debug, Deserialize)]
struct LabelList {
    #[serde(default)]
    labels: Vec<WireLabel>,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<Body>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    data: Option<String>,
}

impl Payload {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn into_document(self) -> DocumentPart {
        match self.body.and_then(|b| b.data) {
            Some(data) => DocumentPart::Leaf {
                mime_type: self.mime_type,
                data,
            },
            None => DocumentPart::Multipart {
                mime_type: self.mime_type,
                parts: self.parts.into_iter().map(Payload::into_document).collect(),
            },
        }
    }
}

/// Gmail REST client authenticated with a bearer token.
pub struct GmailClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        if self.access_token.is_empty() {
            return Err(Error::Configuration("no mailbox access token".to_string()));
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Parse(format!("{}: {}", path, e)))
    }

    async fn message_ids(&self, label_id: &str, limit: u32) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let list: MessageList = self
            .get("/messages", &[("labelIds", label_id), ("maxResults", limit.as_str())])
            .await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl MailboxProvider for GmailClient {
    async fn list_labels(&self) -> Result<Vec<LabelRef>> {
        let list: LabelList = self.get("/labels", &[]).await?;

        Ok(list
            .labels
            .into_iter()
            .filter_map(|label| match (label.id, label.name) {
                (Some(id), Some(name)) if !is_system_label(&id) => Some(LabelRef { id, name }),
                _ => None,
            })
            .collect())
    }

    async fn latest_message_date(&self, label_id: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(id) = self.message_ids(label_id, 1).await?.into_iter().next() else {
            return Ok(None);
        };

        let message: WireMessage = self
            .get(
                &format!("/messages/{}", id),
                &[("format", "metadata"), ("metadataHeaders", "Date")],
            )
            .await?;

        Ok(message
            .payload
            .as_ref()
            .and_then(|p| p.header("Date"))
            .and_then(parse_date))
    }

    async fn list_message_ids(&self, label_id: &str, limit: u32) -> Result<Vec<String>> {
        self.message_ids(label_id, limit).await
    }

    async fn get_message_detail(&self, id: &str) -> Result<Option<MessageDetail>> {
        let message: WireMessage = self
            .get(&format!("/messages/{}", id), &[("format", "full")])
            .await?;
        let Some(payload) = message.payload else {
            return Ok(None);
        };

        let subject = payload.header("Subject").unwrap_or(NO_SUBJECT).to_string();
        let sender = payload.header("From").unwrap_or(NO_SENDER).to_string();
        let date_header = payload.header("Date").map(str::to_string);

        Ok(Some(MessageDetail {
            subject,
            sender,
            date_header,
            root: payload.into_document(),
        }))
    }
}
