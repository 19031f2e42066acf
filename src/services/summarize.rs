use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Transcript summarization. Failures here are recoverable: the pipeline
/// falls back to a minimally structured version of the raw transcript.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, transcript: &str) -> Result<String, SummarizeError>;
}

#[derive(Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Deserialize)]
struct CompletionResult {
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Deserialize)]
struct AlternativeMessage {
    text: String,
}

/// Client for a chat-completion summarization API.
pub struct SummaryApiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl SummaryApiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Summarizer for SummaryApiClient {
    async fn summarize(&self, title: &str, transcript: &str) -> Result<String, SummarizeError> {
        let url = format!("{}/completion", self.base_url);

        let prompt = format!(
            "Produce a short, structured summary of the following lecture transcript \
             titled \"{title}\". Use key theses and conclusions.\n\n{transcript}"
        );

        let request_body = serde_json::json!({
            "model": self.model,
            "completion_options": {
                "max_tokens": 2000,
                "temperature": 0.3
            },
            "messages": [
                {
                    "role": "system",
                    "text": "You are an assistant that writes concise, structured lecture summaries."
                },
                {
                    "role": "user",
                    "text": prompt
                }
            ]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(SummarizeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(SummarizeError::Http)?;
        let summary = completion
            .result
            .alternatives
            .into_iter()
            .next()
            .map(|alternative| alternative.message.text)
            .unwrap_or_default();

        if summary.trim().is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(summary)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("summary service returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("summary service returned an empty summary")]
    Empty,
}
