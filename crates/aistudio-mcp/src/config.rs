use aistudio_client::{ClientConfig, RetryPolicy, StudioClient, API_KEY_ENV, API_URL_ENV};
use aistudio_core::{Error, Pipeline, Result, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT_ENV: &str = "AISTUDIO_TIMEOUT_MS";
pub const RETRY_ATTEMPTS_ENV: &str = "AISTUDIO_RETRY_ATTEMPTS";
pub const ENV_FILE_ENV: &str = "AISTUDIO_ENV_FILE";

/// Backend settings shared by every command that talks to the service.
///
/// Flags win over environment variables. The API key is never printed.
#[derive(clap::Args, Debug, Clone)]
pub struct BackendArgs {
    /// AI Studio API key.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,
    /// Base URL of the extraction service.
    #[arg(long, env = API_URL_ENV)]
    pub api_url: Option<String>,
    /// Timeout for each HTTP attempt (ms). The whole call may take every attempt plus backoff.
    #[arg(long = "timeout-ms", env = TIMEOUT_ENV, default_value_t = 240_000)]
    pub timeout_ms: u64,
    /// Total attempts per backend call for transient failures (429, 5xx, transport).
    #[arg(long, env = RETRY_ATTEMPTS_ENV, default_value_t = 3)]
    pub retry_attempts: u32,
}

impl BackendArgs {
    pub fn client_config(&self) -> Result<ClientConfig> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::NotConfigured(format!("missing API key (set {API_KEY_ENV} or --api-key)"))
            })?;
        if self.timeout_ms == 0 {
            return Err(Error::NotConfigured(
                "timeout must be greater than 0ms".to_string(),
            ));
        }
        let mut cfg = ClientConfig::new(key)?
            .with_request_timeout(Duration::from_millis(self.timeout_ms))
            .with_retry(RetryPolicy {
                attempts: self.retry_attempts,
                ..RetryPolicy::default()
            });
        if let Some(u) = self.api_url.as_deref().filter(|u| !u.trim().is_empty()) {
            cfg = cfg.with_api_url(u)?;
        }
        Ok(cfg)
    }

    /// Builds the catalogue and the HTTP backend. Fails before anything is served.
    pub fn pipeline(&self) -> Result<Pipeline> {
        let cfg = self.client_config()?;
        // The ceiling must outlast every attempt, or a timed-out first attempt is never retried.
        let ceiling = cfg.retry.budget(cfg.request_timeout);
        tracing::info!(
            api_url = %cfg.api_url,
            timeout_ms = self.timeout_ms,
            retry_attempts = cfg.retry.attempts(),
            ceiling_ms = ceiling.as_millis() as u64,
            "backend configured"
        );
        let registry = Arc::new(ToolRegistry::catalogue()?);
        let client = Arc::new(StudioClient::new(cfg)?);
        Ok(Pipeline::new(registry, client).with_call_timeout(ceiling))
    }
}

/// Opt-in `KEY=VALUE` loader named by `AISTUDIO_ENV_FILE`.
///
/// Blank lines and `#` comments are skipped; values never override the process env and are
/// never logged. Returns how many variables were set.
pub fn load_env_file() -> usize {
    let Some(p) = std::env::var(ENV_FILE_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
    else {
        return 0;
    };
    let Ok(txt) = std::fs::read_to_string(p.trim()) else {
        return 0;
    };
    let mut n = 0;
    for (k, v) in parse_env_lines(&txt) {
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
            n += 1;
        }
    }
    n
}

fn parse_env_lines(txt: &str) -> Vec<(&str, &str)> {
    txt.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .filter_map(|s| s.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|x| x.strip_suffix('"'))
                .unwrap_or(v);
            (k.trim(), v)
        })
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(key: Option<&str>) -> BackendArgs {
        BackendArgs {
            api_key: key.map(str::to_string),
            api_url: None,
            timeout_ms: 1000,
            retry_attempts: 2,
        }
    }

    #[test]
    fn missing_or_blank_key_is_not_configured() {
        assert!(matches!(
            args(None).client_config(),
            Err(Error::NotConfigured(_))
        ));
        assert!(matches!(
            args(Some("  ")).client_config(),
            Err(Error::NotConfigured(_))
        ));
    }

    #[test]
    fn flags_flow_into_client_config() {
        let mut a = args(Some("k"));
        a.api_url = Some("http://127.0.0.1:9/".into());
        let cfg = a.client_config().unwrap();
        assert_eq!(cfg.api_url, "http://127.0.0.1:9");
        assert_eq!(cfg.request_timeout, Duration::from_millis(1000));
        assert_eq!(cfg.retry.attempts(), 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut a = args(Some("k"));
        a.timeout_ms = 0;
        assert!(a.client_config().is_err());
    }

    #[test]
    fn pipeline_builds_with_full_catalogue() {
        let p = args(Some("k")).pipeline().unwrap();
        assert_eq!(p.registry().len(), 5);
    }

    #[tokio::test]
    async fn timed_out_first_attempt_is_retried() {
        use aistudio_core::ToolOutput;
        use axum::{routing::post, Json, Router};
        use serde_json::{json, Value};
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        let app = Router::new().route(
            "/search",
            post(move |_body: Json<Value>| {
                let hits = hits2.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(3)).await;
                    }
                    Json(json!({ "data": ["ok"] }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let a = BackendArgs {
            api_key: Some("k".into()),
            api_url: Some(format!("http://{addr}")),
            timeout_ms: 400,
            retry_attempts: 3,
        };
        let args = json!({ "query": "q" }).as_object().cloned().unwrap();
        let out = a.pipeline().unwrap().invoke("ai_search", &args).await.unwrap();
        assert_eq!(out, ToolOutput::Content(json!(["ok"])));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn env_lines_skip_comments_and_strip_quotes() {
        let got = parse_env_lines("# c\n\nA=1\n B = \"two\" \n=x\nnoeq\n");
        assert_eq!(got, vec![("A", "1"), ("B", "two")]);
    }
}
