//! Shared HTTP request execution with retry and exponential backoff.
//!
//! Every provider sends its requests through [`HttpTransport::execute`].
//! Attempt 0 runs immediately; attempt `n` first waits `base * 2^(n-1)`
//! (1s, 2s, 4s with the default base). Network errors, 429 and 5xx are
//! retried until `max_retries` extra attempts are used; any other status
//! returns immediately. Dropping the returned future aborts the in-flight
//! request and any pending backoff sleep.

use std::time::{Duration, Instant};

use memollm_core::{defaults, Error, ProviderConfig, ProviderType, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::{debug, warn};

use crate::http_error::error_from_response;

/// Slow request threshold in milliseconds.
const SLOW_REQUEST_THRESHOLD_MS: u128 = 10_000;

/// HTTP executor shared by all requests of one provider instance.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    provider: ProviderType,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpTransport {
    /// Build a transport using the config's timeout and retry ceiling.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let max_retries = if config.max_retries == 0 {
            defaults::MAX_RETRIES
        } else {
            config.max_retries
        };

        Ok(Self {
            client,
            provider: config.provider_type,
            max_retries,
            backoff_base: Duration::from_millis(defaults::BACKOFF_BASE_MS),
        })
    }

    /// Override the first backoff delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before `attempt` (attempt 0 never waits).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (attempt - 1).min(16);
        self.backoff_base.saturating_mul(factor)
    }

    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>> {
        self.execute::<()>(Method::GET, url, None, headers).await
    }

    pub async fn post_json<B>(&self, url: &str, body: &B, headers: &[(&str, &str)]) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        self.execute(Method::POST, url, Some(body), headers).await
    }

    /// Send a request, retrying transient failures, and return the raw body.
    pub async fn execute<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let payload = body.map(serde_json::to_vec).transpose()?;
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                warn!(
                    subsystem = "inference",
                    component = "transport",
                    provider = %self.provider,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_err.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                    "Retrying request after backoff"
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .request(method.clone(), url)
                .header(CONTENT_TYPE, "application/json");
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            if let Some(ref bytes) = payload {
                request = request.body(bytes.clone());
            }

            let start = Instant::now();
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_builder() => {
                    return Err(Error::Request(format!("Invalid request: {}", e)));
                }
                Err(e) => {
                    last_err = Some(Error::ProviderUnavailable(e.to_string()));
                    continue;
                }
            };

            let status = response.status().as_u16();
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    last_err = Some(Error::ProviderUnavailable(e.to_string()));
                    continue;
                }
            };

            let elapsed_ms = start.elapsed().as_millis();
            if elapsed_ms > SLOW_REQUEST_THRESHOLD_MS {
                warn!(
                    subsystem = "inference",
                    component = "transport",
                    provider = %self.provider,
                    duration_ms = elapsed_ms as u64,
                    slow = true,
                    "Slow provider request"
                );
            }

            if (200..300).contains(&status) {
                debug!(
                    subsystem = "inference",
                    component = "transport",
                    provider = %self.provider,
                    status,
                    attempt,
                    duration_ms = elapsed_ms as u64,
                    response_len = bytes.len(),
                    "Request completed"
                );
                return Ok(bytes.to_vec());
            }

            let err = error_from_response(status, &bytes);
            if !err.is_retryable() {
                debug!(
                    subsystem = "inference",
                    component = "transport",
                    provider = %self.provider,
                    status,
                    error = %err,
                    "Request rejected"
                );
                return Err(err);
            }
            last_err = Some(err);
        }

        Err(last_err.unwrap_or_else(|| Error::Internal("request was never attempted".to_string())))
    }
}

/// Decode a JSON body returned by [`HttpTransport::execute`].
pub fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))
}
