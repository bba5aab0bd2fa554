use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// One node of a message body.
///
/// A part either carries its own inline data or is a container of sub-parts; a part that
/// has neither is a container with no children.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPart {
    Leaf { mime_type: String, data: String },
    Multipart { mime_type: String, parts: Vec<DocumentPart> },
}

impl DocumentPart {
    fn inline_data(&self, wanted: &str) -> Option<&str> {
        match self {
            DocumentPart::Leaf { mime_type, data } if mime_type == wanted => Some(data),
            _ => None,
        }
    }
}

/// Recover readable text from a body tree.
///
/// Precedence: the part's own data, then the first direct `text/plain` child, then the
/// first direct `text/html` child with tags stripped, then the first child subtree that
/// yields anything. An undecodable `text/html` child still ends the search, with empty text.
pub fn extract_body(part: &DocumentPart) -> Option<String> {
    let parts = match part {
        DocumentPart::Leaf { data, .. } => return decode_lossy(data),
        DocumentPart::Multipart { parts, .. } => parts,
    };

    if let Some(data) = parts.iter().find_map(|p| p.inline_data("text/plain")) {
        return decode_lossy(data);
    }

    if let Some(data) = parts.iter().find_map(|p| p.inline_data("text/html")) {
        return Some(strip_html(&decode_lossy(data).unwrap_or_default()));
    }

    parts.iter().find_map(extract_body)
}

fn decode_lossy(data: &str) -> Option<String> {
    match decode_base64url(data) {
        Ok(text) => Some(text),
        Err(e) => {
            log::debug!("dropping body part: {}", e);
            None
        }
    }
}

/// Decode the base64url payload of a body part into UTF-8 text.
pub fn decode_base64url(encoded: &str) -> Result<String> {
    let mut standard: String = encoded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat('=').take(padding));

    let bytes = STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| Error::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
}

pub fn strip_html(html: &str) -> String {
    HTML_TAG.replace_all(html, "").into_owned()
}
