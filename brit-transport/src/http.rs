//! HTTP transport implementation.
//!
//! One POST per exchange; the body is the request envelope and the response
//! body is the reply envelope. Nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use brit_core::constants::{ENVELOPE_CONTENT_TYPE, MATCHER_PATH};
use brit_core::error::{BritError, Result};
use brit_core::traits::Transport;

/// Default cap on a Matcher response body.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// HTTP transport configuration.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TransportConfig {
    /// Full Matcher endpoint (e.g. "https://matcher.example.org/brit")
    pub url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Largest response body accepted
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl TransportConfig {
    /// Creates config for a Matcher endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_seconds: 30,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Creates config for a Matcher base URL, appending the standard path.
    pub fn for_base_url(base: &str) -> Self {
        Self::new(format!("{}{}", base.trim_end_matches('/'), MATCHER_PATH))
    }

    /// Sets the request timeout.
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Sets the response size cap.
    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }
}

/// [`Transport`] over HTTP(S) POST.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    url: Url,
    http_client: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpTransport {
    /// Creates a transport with the given config.
    ///
    /// # Errors
    /// [`BritError::ConfigError`] for an unparsable or non-HTTP URL, a zero
    /// timeout or response cap, or a client that cannot be built.
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| BritError::ConfigError(format!("invalid Matcher URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BritError::ConfigError(format!(
                "unsupported Matcher URL scheme '{}'",
                url.scheme()
            )));
        }
        if config.timeout_seconds == 0 {
            return Err(BritError::ConfigError("timeout must be non-zero".into()));
        }
        if config.max_response_bytes == 0 {
            return Err(BritError::ConfigError("max_response_bytes must be non-zero".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BritError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            http_client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// The Matcher endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, body), fields(url = %self.url, body_len = body.len()))]
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .post(self.url.clone())
            .header(CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| BritError::TransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BritError::TransportFailure(format!("HTTP {}", status)));
        }

        let too_large = || {
            BritError::TransportFailure(format!(
                "response exceeds {} bytes",
                self.max_response_bytes
            ))
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_response_bytes as u64)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong; count what actually arrives.
        let mut response = response;
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BritError::TransportFailure(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_response_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(response_len = bytes.len(), "Matcher responded");
        Ok(bytes)
    }
}
