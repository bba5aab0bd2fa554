use crate::error::{check_status, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: u32 = 1000;

/// How much of the summary template to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Overview, hierarchical content breakdown and action items.
    Full,
    /// Overview section only.
    Overview,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// One round trip, no retries. Returns the trimmed summary text.
    async fn summarize(&self, title: &str, body: &str, sender: &str, detail: Detail)
        -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Gemini `generateContent` client.
pub struct GeminiSummarizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiSummarizer {
    pub fn with_endpoint(api_key: Option<String>, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(
        &self,
        title: &str,
        body: &str,
        sender: &str,
        detail: Detail,
    ) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("no summarizer API key".to_string()))?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(title, body, sender, detail)),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parsed
            .into_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::Parse("response has no candidate text".to_string()))
    }
}

fn build_prompt(title: &str, body: &str, sender: &str, detail: Detail) -> String {
    match detail {
        Detail::Full => format!(
            r#"Analyze the following email and summarize the work it asks for using the template below.

=== Email ===
Subject: {title}
Sender: {sender}
Body: {body}

=== Template ===
[Overview]
1. Topic: (core topic of the email)
2. When: (dates or times mentioned, omit if none)
3. Where: (places mentioned, omit if none)
4. People: (people involved, omit if none)

[Content]
(key content as a hierarchy)
1. Topic 1
    (1) detail
    (2) detail
2. Topic 2
    (1) detail

[Action items]
(things to do or requests, listed clearly)

Rules:
- Leave out greetings and filler
- Keep it short, only the essentials
- Omit sections with no information
- Write in Markdown"#
        ),
        Detail::Overview => format!(
            r#"Analyze the following email and write only the [Overview] section.

=== Email ===
Subject: {title}
Sender: {sender}
Body: {body}

=== Format ===
[Overview]
1. Topic: (core topic of the email)
2. When: (dates or times mentioned, omit if none)
3. Where: (places mentioned, omit if none)
4. People: (people involved, briefly)

Rules:
- Write [Overview] only
- No greetings, essentials only
- Omit items with no information"#
        ),
    }
}
