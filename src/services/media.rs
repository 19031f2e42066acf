use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

/// Audio extraction and duration probing for the transcode stage.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// 16 kHz mono PCM WAV, the input format the speech service expects.
    async fn extract_wav(&self, video: &[u8]) -> Result<Vec<u8>, MediaError>;

    /// 128 kbps MP3, stored as the downloadable audio artifact.
    async fn extract_mp3(&self, video: &[u8]) -> Result<Vec<u8>, MediaError>;

    /// Source duration in seconds. Best-effort enrichment: failures are
    /// logged and reported as `None`, never as a stage failure.
    async fn probe_duration(&self, video: &[u8]) -> Option<f64>;
}

/// Shells out to `ffmpeg`/`ffprobe` with a scratch directory per call.
pub struct FfmpegExtractor {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl FfmpegExtractor {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn write_input(dir: &Path, video: &[u8]) -> Result<std::path::PathBuf, MediaError> {
        let input = dir.join("input.mp4");
        tokio::fs::write(&input, video)
            .await
            .map_err(MediaError::Io)?;
        Ok(input)
    }

    async fn run_ffmpeg(&self, args: &[&str], output: &Path) -> Result<Vec<u8>, MediaError> {
        let result = Command::new(&self.ffmpeg)
            .args(args)
            .output()
            .await
            .map_err(|e| MediaError::Spawn(format!("{}: {e}", self.ffmpeg)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(MediaError::Ffmpeg(stderr.trim().to_string()));
        }

        let bytes = tokio::fs::read(output).await.map_err(MediaError::Io)?;
        if bytes.is_empty() {
            return Err(MediaError::Ffmpeg("output file is empty".to_string()));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract_wav(&self, video: &[u8]) -> Result<Vec<u8>, MediaError> {
        let dir = tempfile::tempdir().map_err(MediaError::Io)?;
        let input = Self::write_input(dir.path(), video).await?;
        let output = dir.path().join("audio.wav");

        self.run_ffmpeg(
            &[
                "-i",
                input.to_str().unwrap_or_default(),
                "-vn",
                "-acodec",
                "pcm_s16le",
                "-ar",
                "16000",
                "-ac",
                "1",
                "-y",
                output.to_str().unwrap_or_default(),
            ],
            &output,
        )
        .await
    }

    async fn extract_mp3(&self, video: &[u8]) -> Result<Vec<u8>, MediaError> {
        let dir = tempfile::tempdir().map_err(MediaError::Io)?;
        let input = Self::write_input(dir.path(), video).await?;
        let output = dir.path().join("audio.mp3");

        self.run_ffmpeg(
            &[
                "-i",
                input.to_str().unwrap_or_default(),
                "-vn",
                "-acodec",
                "libmp3lame",
                "-b:a",
                "128k",
                "-y",
                output.to_str().unwrap_or_default(),
            ],
            &output,
        )
        .await
    }

    async fn probe_duration(&self, video: &[u8]) -> Option<f64> {
        let dir = tempfile::tempdir().ok()?;
        let input = Self::write_input(dir.path(), video).await.ok()?;

        let result = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "csv=p=0",
                input.to_str().unwrap_or_default(),
            ])
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().parse().ok()
            }
            Ok(output) => {
                tracing::warn!(
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "ffprobe duration query failed"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to spawn ffprobe");
                None
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to spawn media tool: {0}")]
    Spawn(String),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}
