use crate::providers::gmail::GMAIL_API_BASE;
use crate::summarizer::GEMINI_ENDPOINT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Bearer token for the mailbox API.
    pub access_token: Option<String>,
    /// Key for the summarization API.
    pub api_key: Option<String>,
    /// OAuth scopes the token was granted for. Informational only.
    #[serde(default)]
    pub scopes: Vec<String>,
    pub mailbox_url: Option<String>,
    pub summarizer_url: Option<String>,
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mail-tasks")
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn mailbox_url(&self) -> &str {
        self.mailbox_url.as_deref().unwrap_or(GMAIL_API_BASE)
    }

    pub fn summarizer_url(&self) -> &str {
        self.summarizer_url.as_deref().unwrap_or(GEMINI_ENDPOINT)
    }
}
