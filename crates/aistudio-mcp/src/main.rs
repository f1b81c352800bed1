use aistudio::config::{self, BackendArgs};
use aistudio::envelope;
use aistudio_core::ToolRegistry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aistudio")]
#[command(about = "AI Studio web extraction tools (MCP stdio server)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio(ServeCmd),
    /// Invoke one tool through the same pipeline the server uses (one JSON line per call).
    Call(CallCmd),
    /// List the tool catalogue with input schemas (no credentials needed).
    Tools(ToolsCmd),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(clap::Args, Debug)]
struct CallCmd {
    /// Tool name (canonical or alias).
    #[arg(long)]
    tool: String,
    /// Arguments as a JSON object.
    #[arg(long, conflicts_with = "args_json_file")]
    args_json: Option<String>,
    /// File holding a JSON object, or an array of objects (one call each, run concurrently).
    #[arg(long)]
    args_json_file: Option<PathBuf>,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(clap::Args, Debug)]
struct ToolsCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Attempt a local stdio MCP handshake (list_tools) against a child `aistudio mcp-stdio`.
    ///
    /// It does not call the extraction service and never prints secret values.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    check_stdio: bool,
    /// Timeout for the stdio handshake (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = config::load_env_file();
    let cli = Cli::parse();
    aistudio::telemetry::init();
    if loaded > 0 {
        tracing::debug!(vars = loaded, "loaded env file");
    }

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio(cmd) => {
            let pipeline = cmd.backend.pipeline().map_err(|e| {
                tracing::error!("{e}");
                e
            })?;
            aistudio::server::serve_stdio(pipeline).await?;
        }
        Commands::Call(cmd) => run_call(cmd).await?,
        Commands::Tools(cmd) => {
            let registry = ToolRegistry::catalogue()?;
            print_tools(&registry, &cmd.output);
        }
        Commands::Doctor(cmd) => run_doctor(cmd).await?,
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "aistudio",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("aistudio {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}

fn parse_arg_sets(raw: &str) -> Result<Vec<Map<String, Value>>> {
    match serde_json::from_str::<Value>(raw).context("arguments are not valid JSON")? {
        Value::Object(m) => Ok(vec![m]),
        Value::Array(items) if items.is_empty() => anyhow::bail!("arguments array is empty"),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Object(m) => Ok(m),
                _ => anyhow::bail!("arguments[{i}] must be a JSON object"),
            })
            .collect(),
        _ => anyhow::bail!("arguments must be a JSON object or an array of objects"),
    }
}

async fn run_call(cmd: CallCmd) -> Result<()> {
    let arg_sets = match (&cmd.args_json, &cmd.args_json_file) {
        (Some(s), _) => parse_arg_sets(s)?,
        (None, Some(p)) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("read {}", p.display()))?;
            parse_arg_sets(&raw)?
        }
        (None, None) => vec![Map::new()],
    };

    let pipeline = cmd.backend.pipeline()?;
    let outcomes =
        futures::future::join_all(arg_sets.iter().map(|a| pipeline.invoke(&cmd.tool, a))).await;

    let mut failed = 0;
    for outcome in &outcomes {
        let line = match outcome {
            Ok(out) => envelope::success(&cmd.tool, out),
            Err(e) => {
                failed += 1;
                envelope::failure(&cmd.tool, e)
            }
        };
        println!("{line}");
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} calls failed", outcomes.len());
    }
    Ok(())
}

fn print_tools(registry: &ToolRegistry, output: &str) {
    match output.to_ascii_lowercase().as_str() {
        "text" => {
            for d in registry.tools() {
                let summary = d.description.lines().next().unwrap_or("");
                println!("{}: {}", d.name, summary);
                for a in &d.args {
                    println!(
                        "  - {}{}",
                        a.name,
                        if a.required { " (required)" } else { "" }
                    );
                }
            }
            for (alias, target) in registry.aliases() {
                println!("{alias} -> {target}");
            }
        }
        _ => {
            let tools: Vec<Value> = registry
                .tools()
                .map(|d| {
                    serde_json::json!({
                        "name": d.name,
                        "description": d.description,
                        "input_schema": d.input_schema(),
                    })
                })
                .collect();
            let aliases: Map<String, Value> = registry
                .aliases()
                .map(|(a, t)| (a.to_string(), Value::String(t.to_string())))
                .collect();
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "tools",
                "tools": tools,
                "aliases": aliases,
            });
            println!("{v}");
        }
    }
}

async fn run_doctor(args: DoctorCmd) -> Result<()> {
    fn has_env(k: &str) -> bool {
        std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
    }

    let t0 = std::time::Instant::now();

    // Presence only; never print values.
    let api_key_configured = has_env(aistudio_client::API_KEY_ENV);
    let api_url_overridden = has_env(aistudio_client::API_URL_ENV);
    let env_file_configured = has_env(config::ENV_FILE_ENV);

    let mut checks: Vec<Value> = Vec::new();

    checks.push(serde_json::json!({
        "name": "api_key_present",
        "ok": api_key_configured,
        "message": if api_key_configured { "API key is set" } else { "API key is missing" },
        "hint": if api_key_configured {
            String::new()
        } else {
            format!(
                "Set {} in the MCP server environment (or via {}).",
                aistudio_client::API_KEY_ENV,
                config::ENV_FILE_ENV
            )
        },
    }));

    let catalogue = ToolRegistry::catalogue();
    let catalogue_ok = catalogue.is_ok();
    checks.push(serde_json::json!({
        "name": "tool_catalogue",
        "ok": catalogue_ok,
        "tool_count": catalogue.as_ref().map(|r| r.len()).ok(),
        "message": match &catalogue {
            Ok(_) => "tool catalogue is valid".to_string(),
            Err(e) => e.to_string(),
        },
    }));

    // Check: stdio MCP handshake (optional).
    let mut stdio_ok: Option<bool> = None;
    let mut stdio_tool_count: Option<usize> = None;
    let mut stdio_error: Option<Value> = None;
    let mut stdio_elapsed_ms: Option<u128> = None;

    #[cfg(feature = "stdio")]
    if args.check_stdio {
        use rmcp::service::ServiceExt;
        use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
        use tokio::process::Command;

        let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("aistudio"));
        let child = TokioChildProcess::new(Command::new(exe).configure(|cmd| {
            cmd.args(["mcp-stdio"]);
            cmd.env("RUST_LOG", "error");
        }))?;

        let check_t0 = std::time::Instant::now();
        let res = tokio::time::timeout(std::time::Duration::from_millis(args.timeout_ms), async {
            let service = ().serve(child).await?;
            let tools = service.list_tools(Default::default()).await;
            let _ = service.cancel().await;
            Ok::<_, anyhow::Error>(tools?)
        })
        .await;
        stdio_elapsed_ms = Some(check_t0.elapsed().as_millis());

        match res {
            Ok(Ok(tools)) => {
                stdio_ok = Some(true);
                stdio_tool_count = Some(tools.tools.len());
            }
            Ok(Err(e)) => {
                stdio_ok = Some(false);
                let hint = if api_key_configured {
                    "The child process closed the stdio transport early. Check that nothing prints to stdout in mcp-stdio mode and that the MCP client runs `aistudio mcp-stdio`."
                } else {
                    "`aistudio mcp-stdio` refuses to start without an API key. Set it first."
                };
                stdio_error = Some(serde_json::json!({
                    "code": "handshake_failed",
                    "message": e.to_string(),
                    "hint": hint
                }));
            }
            Err(_elapsed) => {
                stdio_ok = Some(false);
                stdio_error = Some(serde_json::json!({
                    "code": "timeout",
                    "message": format!("stdio handshake timed out after {}ms", args.timeout_ms),
                    "hint": "The child did not answer list_tools in time. Raise --timeout-ms or check for a stuck startup."
                }));
            }
        }
    }

    #[cfg(not(feature = "stdio"))]
    if args.check_stdio {
        stdio_ok = Some(false);
    }

    checks.push(serde_json::json!({
        "name": "mcp_stdio_handshake",
        "ok": if args.check_stdio { stdio_ok.unwrap_or(false) } else { true },
        "skipped": !args.check_stdio,
        "message": if !args.check_stdio {
            "stdio MCP handshake skipped"
        } else if stdio_ok.unwrap_or(false) {
            "stdio MCP handshake succeeded"
        } else {
            "stdio MCP handshake failed"
        },
        "hint": if !args.check_stdio || stdio_ok.unwrap_or(false) {
            ""
        } else if cfg!(feature = "stdio") {
            "Point the MCP client at the `aistudio` binary with args [\"mcp-stdio\"]."
        } else {
            "`mcp-stdio` requires building with feature `stdio`."
        },
        "tool_count": stdio_tool_count,
        "elapsed_ms": stdio_elapsed_ms,
        "error": stdio_error,
    }));

    let ok = checks.iter().all(|c| c["ok"].as_bool().unwrap_or(false));
    let payload = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": ok,
        "name": "aistudio",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": {
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
        "features": {
            "stdio": cfg!(feature = "stdio"),
        },
        "elapsed_ms": t0.elapsed().as_millis(),
        "configured": {
            "api_key": api_key_configured,
            "api_url_overridden": api_url_overridden,
            "env_file": env_file_configured,
        },
        "checks": checks,
    });

    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            println!("aistudio {} (ok={})", env!("CARGO_PKG_VERSION"), ok);
            println!(
                "configured: api_key={} api_url_overridden={} env_file={}",
                api_key_configured, api_url_overridden, env_file_configured
            );
            println!("checks:");
            if let Some(arr) = payload["checks"].as_array() {
                for c in arr {
                    let name = c["name"].as_str().unwrap_or("?");
                    let ok = c["ok"].as_bool().unwrap_or(false);
                    if c["skipped"].as_bool().unwrap_or(false) {
                        println!("- {name}: skipped");
                    } else {
                        println!("- {name}: {}", if ok { "ok" } else { "fail" });
                    }
                }
            }
        }
        _ => println!("{payload}"),
    }
    Ok(())
}
