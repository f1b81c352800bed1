#![cfg(feature = "stdio")]

use std::collections::BTreeSet;

#[test]
fn aistudio_mcp_stdio_without_key_exits_non_zero() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("aistudio");
    cmd.args(["mcp-stdio"])
        .env_remove("OXYLABS_AI_STUDIO_API_KEY")
        .env_remove("AISTUDIO_ENV_FILE")
        .write_stdin("");
    cmd.assert()
        .failure()
        .stdout(predicates::str::is_empty())
        .stderr(predicates::str::contains("OXYLABS_AI_STUDIO_API_KEY"));
}

#[test]
fn aistudio_mcp_stdio_contract() {
    // Spawns the server as a child process against a local fake extraction service.
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(async {
        use axum::{routing::post, Json, Router};
        use rmcp::{
            model::CallToolRequestParam,
            service::ServiceExt,
            transport::{ConfigureCommandExt, TokioChildProcess},
        };
        use serde_json::{json, Value};
        use std::net::SocketAddr;

        let app = Router::new()
            .route(
                "/search",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "data": [{
                            "url": "https://tokio.rs",
                            "title": "Tokio",
                            "query": body["query"],
                            "limit": body["limit"],
                            "return_content": body["return_content"],
                        }]
                    }))
                }),
            )
            .route(
                "/scrape/schema",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "openapi_schema": {
                            "type": "object",
                            "properties": { "title": { "type": "string" } }
                        },
                        "prompt": body["user_prompt"],
                    }))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });

        let bin = assert_cmd::cargo::cargo_bin!("aistudio");
        let service = ()
            .serve(TokioChildProcess::new(
                tokio::process::Command::new(bin).configure(|cmd| {
                    cmd.args(["mcp-stdio"]);
                    cmd.env("OXYLABS_AI_STUDIO_API_KEY", "test-key");
                    cmd.env("OXYLABS_AI_STUDIO_API_URL", format!("http://{addr}"));
                    cmd.env("AISTUDIO_RETRY_ATTEMPTS", "1");
                    cmd.env_remove("AISTUDIO_ENV_FILE");
                    cmd.env("RUST_LOG", "error");
                }),
            )?)
            .await?;

        let tools = service.list_tools(Default::default()).await?;
        let names: BTreeSet<String> = tools
            .tools
            .iter()
            .map(|t| t.name.clone().into_owned())
            .collect();
        for must_have in [
            "generate_schema",
            "scrape",
            "ai_scraper",
            "crawl",
            "ai_crawler",
            "browser_agent",
            "ai_search",
        ] {
            assert!(names.contains(must_have), "missing tool {must_have}");
        }

        // ai_search: backend `data` comes back unchanged under `content`, defaults applied.
        let search = service
            .call_tool(CallToolRequestParam {
                name: "ai_search".into(),
                arguments: Some(json!({ "query": "async runtime" }).as_object().cloned().unwrap()),
            })
            .await?;
        assert_ne!(search.is_error, Some(true));
        let search_s = search
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default();
        let search_v: Value = serde_json::from_str(&search_s)?;
        assert_eq!(
            search_v,
            json!({
                "content": [{
                    "url": "https://tokio.rs",
                    "title": "Tokio",
                    "query": "async runtime",
                    "limit": 10,
                    "return_content": true,
                }]
            })
        );
        assert_eq!(search.structured_content, Some(search_v));

        // Invalid URL: tool-level error, not a protocol error.
        let bad = service
            .call_tool(CallToolRequestParam {
                name: "scrape".into(),
                arguments: Some(
                    json!({ "url": "not a url", "output_format": "markdown" })
                        .as_object()
                        .cloned()
                        .unwrap(),
                ),
            })
            .await?;
        assert_eq!(bad.is_error, Some(true));
        let bad_v = bad.structured_content.clone().unwrap_or_default();
        assert_eq!(bad_v["ok"], json!(false));
        assert_eq!(bad_v["error"]["code"], json!("invalid_params"));

        // Legacy field name is rejected with a pointer to the canonical one.
        let legacy = service
            .call_tool(CallToolRequestParam {
                name: "browser_agent".into(),
                arguments: Some(
                    json!({
                        "url": "https://example.com",
                        "task_prompt": "find the price",
                        "output_format": "markdown"
                    })
                    .as_object()
                    .cloned()
                    .unwrap(),
                ),
            })
            .await?;
        assert_eq!(legacy.is_error, Some(true));
        let legacy_msg = legacy.structured_content.clone().unwrap_or_default()["error"]
            ["message"]
            .as_str()
            .unwrap_or("")
            .to_string();
        assert!(legacy_msg.contains("browse_prompt"), "{legacy_msg}");

        // generate_schema returns the backend response whole.
        let schema = service
            .call_tool(CallToolRequestParam {
                name: "generate_schema".into(),
                arguments: Some(
                    json!({ "user_prompt": "page title", "app_name": "ai_scraper" })
                        .as_object()
                        .cloned()
                        .unwrap(),
                ),
            })
            .await?;
        assert_ne!(schema.is_error, Some(true));
        let schema_v = schema.structured_content.clone().unwrap_or_default();
        assert_eq!(schema_v["prompt"], json!("page title"));
        assert_eq!(schema_v["openapi_schema"]["type"], json!("object"));

        let bad_app = service
            .call_tool(CallToolRequestParam {
                name: "generate_schema".into(),
                arguments: Some(
                    json!({ "user_prompt": "x", "app_name": "ai_search" })
                        .as_object()
                        .cloned()
                        .unwrap(),
                ),
            })
            .await?;
        assert_eq!(bad_app.is_error, Some(true));
        assert_eq!(
            bad_app.structured_content.clone().unwrap_or_default()["error"]["code"],
            json!("invalid_tool_argument")
        );

        // Unknown tool is a protocol error.
        let unknown = service
            .call_tool(CallToolRequestParam {
                name: "web_fetch".into(),
                arguments: None,
            })
            .await;
        assert!(unknown.is_err());

        service.cancel().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .expect("mcp stdio contract");
}
