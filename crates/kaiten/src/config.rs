//! Worker configuration.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigurationError;
use crate::request::ContentOrder;

/// Default ceiling on in-flight requests per worker
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Default endpoint of a locally served vLLM OpenAI-compatible server
pub const DEFAULT_BASE_URL: &str = "http://0.0.0.0:8000/v1";

/// Placeholder credential accepted by servers that do not check keys
pub const DEFAULT_API_KEY: &str = "none";

/// Configuration a [`BatchInferenceWorker`](crate::BatchInferenceWorker) is built from.
///
/// The worker keeps its own copy; changing a config after construction has no
/// effect on workers already built from it.
///
/// ```
/// use std::time::Duration;
/// use kaiten::{ContentOrder, WorkerConfig};
///
/// let config = WorkerConfig::new("http://localhost:8000/v1", "none")
///     .with_max_concurrency(16)
///     .with_content_order(ContentOrder::ImageFirst)
///     .with_batch_timeout(Duration::from_secs(600));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Base URL of the OpenAI-compatible API, including any `/v1` suffix
    pub base_url: String,

    /// Bearer credential sent with every request
    pub api_key: String,

    /// Maximum number of row requests in flight across all batches of one worker
    pub max_concurrency: usize,

    /// Where the image block goes relative to the text block
    pub content_order: ContentOrder,

    /// Per-request timeout applied by the HTTP client
    pub request_timeout: Option<Duration>,

    /// Default deadline for a whole batch; unfinished rows fail with a timeout
    pub batch_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            content_order: ContentOrder::default(),
            request_timeout: None,
            batch_timeout: None,
        }
    }
}

impl WorkerConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// * `OPENAI_BASE_URL`, `OPENAI_API_KEY`
    /// * `KAITEN_MAX_CONCURRENCY`
    /// * `KAITEN_REQUEST_TIMEOUT_SECS`, `KAITEN_BATCH_TIMEOUT_SECS`
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.parse::<f64>().ok())
                .and_then(|v| Duration::try_from_secs_f64(v).ok())
        };

        Self {
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: lookup("OPENAI_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            max_concurrency: lookup("KAITEN_MAX_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            content_order: ContentOrder::default(),
            request_timeout: secs("KAITEN_REQUEST_TIMEOUT_SECS"),
            batch_timeout: secs("KAITEN_BATCH_TIMEOUT_SECS"),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_content_order(mut self, order: ContentOrder) -> Self {
        self.content_order = order;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Checks the invariants a worker relies on.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_concurrency == 0 {
            return Err(ConfigurationError::ZeroConcurrency);
        }
        self.endpoint().map(|_| ())
    }

    pub(crate) fn endpoint(&self) -> Result<Url, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidEndpoint {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme `{}`", other))),
        }
    }
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("max_concurrency", &self.max_concurrency)
            .field("content_order", &self.content_order)
            .field("request_timeout", &self.request_timeout)
            .field("batch_timeout", &self.batch_timeout)
            .finish()
    }
}
