use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Fetches the source video bytes for the acquire stage.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP video downloader. Follows redirects, sends a browser user agent
/// (some file hosts refuse unknown clients), and rejects empty bodies.
pub struct HttpVideoFetcher {
    http: Client,
}

impl HttpVideoFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl VideoFetcher for HttpVideoFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await.map_err(FetchError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(FetchError::Http)?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        tracing::debug!(url = %url, size = bytes.len(), "Video downloaded");
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download returned status {0}")]
    Status(u16),

    #[error("downloaded video file is empty")]
    EmptyBody,
}
