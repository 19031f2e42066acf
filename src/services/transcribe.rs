use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Speech-to-text: WAV bytes in, recognized text out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<String, TranscribeError>;
}

#[derive(Deserialize)]
struct RecognizeResponse {
    result: Option<String>,
}

/// Client for a SpeechKit-style synchronous recognition API: raw LPCM/WAV
/// bytes posted to `stt:recognize`, text back in `result`.
pub struct SpeechApiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl SpeechApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for SpeechApiClient {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<String, TranscribeError> {
        let url = format!("{}/stt:recognize", self.base_url);

        tracing::debug!(bytes = audio_wav.len(), "Sending audio to speech service");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "audio/x-wav")
            .query(&[
                ("lang", "auto"),
                ("format", "lpcm"),
                ("sampleRateHertz", "16000"),
            ])
            .body(audio_wav.to_vec())
            .send()
            .await
            .map_err(TranscribeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let recognized: RecognizeResponse = response.json().await.map_err(TranscribeError::Http)?;
        recognized.result.ok_or(TranscribeError::NoResult)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("speech service returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("speech service response carried no transcription result")]
    NoResult,
}
