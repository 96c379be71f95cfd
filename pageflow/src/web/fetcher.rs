//! HTTP fetching with user-agent rotation and failure classification.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::{ConfigurationError, FetchError};

/// Configuration for HTTP fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agents; one is picked at random per request.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_size")]
    pub max_response_size: usize,
    /// Status codes treated as transient.
    #[serde(default = "default_transient_status_codes")]
    pub transient_status_codes: HashSet<u16>,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
    ]
}

fn default_max_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_transient_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agents: default_user_agents(),
            headers: HashMap::new(),
            max_response_size: default_max_size(),
            transient_status_codes: default_transient_status_codes(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Replaces the user agent pool with a single agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agents = vec![user_agent.into()];
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the response size cap.
    #[must_use]
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Whether a status code should be retried.
    #[must_use]
    pub fn is_transient_status(&self, status: u16) -> bool {
        self.transient_status_codes.contains(&status)
    }

    /// Picks a user agent at random.
    #[must_use]
    pub fn pick_user_agent(&self) -> Option<&str> {
        self.user_agents.choose(&mut rand::thread_rng()).map(String::as_str)
    }

    /// Rejects unusable settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(ConfigurationError::new("timeout_seconds", "must be a positive number"));
        }
        if self.max_response_size == 0 {
            return Err(ConfigurationError::new("max_response_size", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text.
    pub text: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Content type from headers.
    pub content_type: Option<String>,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: f64,
}

impl FetchResult {
    /// Whether the response is HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
    }
}

/// Loads the body of a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError>;

    /// Fetches `url` as raw bytes, for images and other assets.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(self.fetch(url).await?.text.into_bytes())
    }
}

/// A successful response before the body is decoded.
struct RawResponse {
    status: u16,
    final_url: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Builds a client from `config`.
    pub fn new(config: FetchConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ConfigurationError::new("fetch", e.to_string()))?;
        Ok(Self { client, config })
    }

    /// The fetcher's configuration.
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn request(&self, url: &str) -> Result<RawResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(agent) = self.config.pick_user_agent() {
            request = request.header(USER_AGENT, agent);
        }
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            if e.is_builder() {
                FetchError::InvalidUrl {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                    timeout: e.is_timeout(),
                }
            }
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                transient: self.config.is_transient_status(status),
            });
        }

        let limit = self.config.max_response_size;
        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit,
        };
        if response
            .content_length()
            .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > limit))
        {
            return Err(too_large());
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
            timeout: e.is_timeout(),
        })?;
        if body.len() > limit {
            return Err(too_large());
        }

        Ok(RawResponse {
            status,
            final_url,
            content_type,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let start = Instant::now();
        debug!(url = %url, "HTTP fetch starting");

        let raw = self.request(url).await?;
        let result = FetchResult {
            status_code: raw.status,
            text: String::from_utf8_lossy(&raw.body).into_owned(),
            final_url: raw.final_url,
            content_type: raw.content_type,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        debug!(
            url = %url,
            status = raw.status,
            bytes = raw.body.len(),
            duration_ms = result.duration_ms,
            "HTTP fetch finished"
        );
        Ok(result)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url = %url, "HTTP asset fetch starting");
        let raw = self.request(url).await?;
        debug!(url = %url, status = raw.status, bytes = raw.body.len(), "HTTP asset fetch finished");
        Ok(raw.body)
    }
}
