use aistudio_client::{ClientConfig, RetryPolicy, StudioClient};
use aistudio_core::{prepare, BackendError, ExtractionBackend, ToolRegistry};
use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, retry: RetryPolicy) -> StudioClient {
    let cfg = ClientConfig::new("test-key")
        .unwrap()
        .with_api_url(&format!("http://{addr}"))
        .unwrap()
        .with_request_timeout(Duration::from_millis(500))
        .with_retry(RetryPolicy {
            initial_backoff: Duration::from_millis(5),
            ..retry
        });
    StudioClient::new(cfg).unwrap()
}

fn payload(tool: &str, args: Value) -> aistudio_core::BackendPayload {
    let r = ToolRegistry::catalogue().unwrap();
    prepare(&r, tool, args.as_object().unwrap()).unwrap().payload
}

#[tokio::test]
async fn sends_bearer_and_shaped_body_to_routed_path() {
    let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    let app = Router::new().route(
        "/scrape/auto-schema",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen2.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push((auth, body));
                Json(json!({ "data": { "title": "Example Domain" } }))
            }
        }),
    );
    let addr = serve(app).await;

    let p = payload(
        "scrape",
        json!({ "url": "https://example.com", "output_format": "json", "user_prompt": "page title" }),
    );
    let v = client(addr, RetryPolicy::none()).execute(&p).await.unwrap();
    assert_eq!(v["data"]["title"], json!("Example Domain"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "Bearer test-key");
    assert_eq!(seen[0].1, p.body);
    assert!(seen[0].1.get("openapi_schema").is_none());
}

#[tokio::test]
async fn retries_transient_status_then_succeeds() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits2 = hits.clone();
    let app = Router::new().route(
        "/search",
        post(move |_body: Json<Value>| {
            let hits = hits2.clone();
            async move {
                if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "detail": "busy" })))
                } else {
                    (StatusCode::OK, Json(json!({ "data": [] })))
                }
            }
        }),
    );
    let addr = serve(app).await;

    let p = payload("ai_search", json!({ "query": "rust" }));
    let v = client(addr, RetryPolicy::default()).execute(&p).await.unwrap();
    assert_eq!(v, json!({ "data": [] }));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_configured_attempts() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits2 = hits.clone();
    let app = Router::new().route(
        "/search",
        post(move |_body: Json<Value>| {
            let hits = hits2.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::BAD_GATEWAY, "upstream down")
            }
        }),
    );
    let addr = serve(app).await;

    let p = payload("ai_search", json!({ "query": "rust" }));
    let e = client(
        addr,
        RetryPolicy {
            attempts: 2,
            ..RetryPolicy::default()
        },
    )
    .execute(&p)
    .await
    .unwrap_err();
    assert_eq!(
        e,
        BackendError::Status {
            status: 502,
            message: "upstream down".into()
        }
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits2 = hits.clone();
    let app = Router::new().route(
        "/crawl",
        post(move |_body: Json<Value>| {
            let hits = hits2.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "detail": "Invalid API key" })),
                )
            }
        }),
    );
    let addr = serve(app).await;

    let p = payload(
        "crawl",
        json!({ "url": "https://docs.rs", "crawl_prompt": "tokio", "output_format": "markdown" }),
    );
    let e = client(addr, RetryPolicy::default())
        .execute(&p)
        .await
        .unwrap_err();
    assert_eq!(
        e,
        BackendError::Status {
            status: 401,
            message: "Invalid API key".into()
        }
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slow_backend_maps_to_timeout() {
    let app = Router::new().route(
        "/browser-agent",
        post(|_body: Json<Value>| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "data": "late" }))
        }),
    );
    let addr = serve(app).await;

    let p = payload(
        "browser_agent",
        json!({ "url": "https://a.io", "browse_prompt": "x", "output_format": "html" }),
    );
    let e = client(addr, RetryPolicy::none()).execute(&p).await.unwrap_err();
    assert_eq!(e, BackendError::Timeout(500));
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let app = Router::new().route(
        "/scrape",
        post(|_body: Json<Value>| async { "<html>maintenance</html>" }),
    );
    let addr = serve(app).await;

    let p = payload(
        "scrape",
        json!({ "url": "https://a.io", "output_format": "markdown" }),
    );
    let e = client(addr, RetryPolicy::default())
        .execute(&p)
        .await
        .unwrap_err();
    assert!(matches!(e, BackendError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let p = payload("ai_search", json!({ "query": "rust" }));
    let e = client(addr, RetryPolicy::none()).execute(&p).await.unwrap_err();
    assert!(matches!(e, BackendError::Transport(_)));
}
