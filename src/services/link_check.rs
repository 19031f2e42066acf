use std::time::Duration;

use reqwest::Client;
use url::Url;

const VIDEO_EXTENSIONS: [&str; 6] = [".mp4", ".mov", ".mkv", ".webm", ".avi", ".m4v"];

/// Pre-submission reachability check for video links. Rejections become
/// `ValidationError`s before any task record or queue message exists.
pub struct LinkValidator {
    http: Client,
}

impl LinkValidator {
    pub fn new() -> Result<Self, LinkCheckError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LinkCheckError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    /// Checks that the URL parses, uses http(s), resolves with a success
    /// status, and looks like a video file by content type or extension.
    pub async fn validate(&self, raw_url: &str) -> Result<(), LinkCheckError> {
        let url = Url::parse(raw_url).map_err(|e| LinkCheckError::Malformed(e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LinkCheckError::Scheme(url.scheme().to_string()));
        }

        let response = self
            .http
            .head(url.clone())
            .send()
            .await
            .map_err(|e| LinkCheckError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkCheckError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("video/") {
            return Ok(());
        }

        let path = url.path().to_ascii_lowercase();
        if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return Ok(());
        }

        Err(LinkCheckError::NotVideo(content_type))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkCheckError {
    #[error("failed to build link-check client: {0}")]
    Client(String),

    #[error("not a valid URL: {0}")]
    Malformed(String),

    #[error("unsupported URL scheme: {0}")]
    Scheme(String),

    #[error("URL is unreachable: {0}")]
    Unreachable(String),

    #[error("URL returned status {0}")]
    Status(u16),

    #[error("URL does not resolve to a video resource (content type: {0})")]
    NotVideo(String),
}
