use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// S3-compatible endpoint URL (e.g., "https://storage.example.net")
    pub s3_endpoint: String,

    /// S3 region name
    #[serde(default = "default_s3_region")]
    pub s3_region: String,

    /// Bucket holding task records and derived artifacts
    pub bucket_name: String,

    /// S3 access key ID
    pub s3_access_key: String,

    /// S3 secret access key
    pub s3_secret_key: String,

    /// Base URL under which stored objects are publicly reachable,
    /// used to build artifact links (e.g., "https://storage.example.net/bucket")
    pub public_base_url: String,

    /// Redis connection string for the work queue
    pub redis_url: String,

    /// Speech-to-text API base URL
    pub speech_api_url: String,

    /// Speech-to-text API key
    pub speech_api_key: String,

    /// Summarization API base URL
    pub summary_api_url: String,

    /// Summarization API key
    pub summary_api_key: String,

    /// Summarization model identifier
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Whether submissions must pass a reachability/content-type check
    #[serde(default = "default_validate_links")]
    pub validate_links: bool,

    /// Seconds a received work item stays invisible to other consumers
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Deliveries after which an item is dead-lettered instead of retried
    #[serde(default = "default_max_receives")]
    pub max_receives: u32,

    /// Worker poll interval in milliseconds when the queue is empty
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Video download timeout in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_summary_model() -> String {
    "summarizer-lite".to_string()
}

fn default_validate_links() -> bool {
    true
}

fn default_visibility_timeout_secs() -> u64 {
    3600
}

fn default_max_receives() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_download_timeout_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
