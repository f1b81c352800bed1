use aistudio_core::{BackendError, BackendPayload, Error, ExtractionBackend, Result};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

pub mod retry;
pub mod routes;

pub use retry::RetryPolicy;

pub const API_KEY_ENV: &str = "OXYLABS_AI_STUDIO_API_KEY";
pub const API_URL_ENV: &str = "OXYLABS_AI_STUDIO_API_URL";

const MAX_ERROR_BODY_CHARS: usize = 300;

fn env_nonempty(k: &str) -> Option<String> {
    std::env::var(k)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn api_key_from_env() -> Option<String> {
    env_nonempty(API_KEY_ENV)
}

pub fn api_url_from_env() -> Option<String> {
    env_nonempty(API_URL_ENV)
}

#[derive(Clone)]
pub struct ClientConfig {
    pub api_url: String,
    api_key: String,
    /// Per-request timeout. The pipeline applies its own ceiling on top.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    /// A blank key is treated as missing.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::NotConfigured(format!("missing {API_KEY_ENV}")));
        }
        Ok(Self {
            api_url: aistudio_core::DEFAULT_API_URL.to_string(),
            api_key,
            request_timeout: aistudio_core::DEFAULT_CALL_TIMEOUT,
            retry: RetryPolicy::default(),
        })
    }

    /// Reads the key (required) and base URL (optional) from the environment.
    pub fn from_env() -> Result<Self> {
        let cfg = Self::new(api_key_from_env().unwrap_or_default())?;
        match api_url_from_env() {
            Some(u) => cfg.with_api_url(&u),
            None => Ok(cfg),
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        let u = url::Url::parse(api_url.trim())
            .map_err(|e| Error::NotConfigured(format!("invalid API URL {api_url:?}: {e}")))?;
        if !matches!(u.scheme(), "http" | "https") {
            return Err(Error::NotConfigured(format!(
                "invalid API URL {api_url:?}: scheme must be http or https"
            )));
        }
        self.api_url = api_url.trim().trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// [`ExtractionBackend`] over HTTPS with bearer authentication.
#[derive(Debug, Clone)]
pub struct StudioClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl StudioClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aistudio-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::NotConfigured(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_once(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> std::result::Result<Value, BackendError> {
        let resp = self
            .http
            .post(endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                BackendError::Decode(e.to_string())
            }
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.config.request_timeout.as_millis() as u64)
        } else {
            // Strip the URL: it is already in the caller's context and may carry a query.
            BackendError::Transport(e.without_url().to_string())
        }
    }
}

#[async_trait::async_trait]
impl ExtractionBackend for StudioClient {
    async fn execute(&self, payload: &BackendPayload) -> std::result::Result<Value, BackendError> {
        let endpoint = routes::endpoint(&self.config.api_url, payload.operation);
        let policy = self.config.retry;
        let attempts = policy.attempts();
        let t0 = Instant::now();

        let mut attempt = 1;
        loop {
            match self.send_once(&endpoint, &payload.body).await {
                Ok(v) => {
                    tracing::debug!(
                        operation = %payload.operation,
                        attempt,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "backend responded"
                    );
                    return Ok(v);
                }
                Err(e) if attempt < attempts && e.is_transient() => {
                    let delay = policy.delay(attempt);
                    tracing::warn!(
                        operation = %payload.operation,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient backend failure, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Short, single-line description of an error response body.
///
/// Prefers a `detail`/`message`/`error` string when the body is JSON.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
    });
    let s = from_json.unwrap_or_else(|| body.split_whitespace().collect::<Vec<_>>().join(" "));
    if s.is_empty() {
        return "empty response body".to_string();
    }
    if s.chars().count() > MAX_ERROR_BODY_CHARS {
        let mut t: String = s.chars().take(MAX_ERROR_BODY_CHARS).collect();
        t.push('…');
        t
    } else {
        s
    }
}
