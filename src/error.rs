/// Failures raised by the mailbox and summarizer clients.
///
/// Only the list calls that start a sync surface these to the user; per-item failures are
/// logged and degraded by the sync layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not configured: {0}")]
    Configuration(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("undecodable body: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map a non-success response to `Error::Upstream`, keeping the body in the debug log.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("upstream error {}: {}", status, body);
    Err(Error::Upstream {
        status: status.as_u16(),
    })
}
