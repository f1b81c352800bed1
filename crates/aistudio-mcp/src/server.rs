use crate::envelope;
use aistudio_core::{Error, Pipeline, ToolOutput, ToolRegistry};
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use std::future::Future;
use std::sync::Arc;

/// MCP front end over one shared [`Pipeline`].
#[derive(Clone)]
pub struct AiStudioMcp {
    pipeline: Pipeline,
    tools: Arc<Vec<Tool>>,
}

impl AiStudioMcp {
    pub fn new(pipeline: Pipeline) -> Self {
        let tools = Arc::new(tool_list(pipeline.registry()));
        Self { pipeline, tools }
    }
}

/// Every canonical tool followed by every alias, each with its input schema.
pub fn tool_list(registry: &ToolRegistry) -> Vec<Tool> {
    let mut out: Vec<Tool> = registry
        .tools()
        .map(|d| {
            Tool::new(
                d.name.clone(),
                d.description.clone(),
                Arc::new(d.input_schema()),
            )
        })
        .collect();
    for (alias, target) in registry.aliases() {
        if let Ok(d) = registry.lookup(target) {
            out.push(Tool::new(
                alias.to_string(),
                format!("Alias of `{target}`. {}", d.description),
                Arc::new(d.input_schema()),
            ));
        }
    }
    out
}

/// Structured content plus the same document as text, for clients that only read text.
///
/// `structuredContent` must be an object; anything else is returned as text only.
pub fn tool_result(out: &ToolOutput) -> CallToolResult {
    let v = out.to_value();
    if !v.is_object() {
        return CallToolResult::success(vec![Content::text(v.to_string())]);
    }
    let mut r = CallToolResult::structured(v);
    r.content = vec![Content::text(out.to_text())];
    r
}

/// Runs `work` unless `cancelled` resolves first, in which case `work` is dropped mid-flight.
async fn until_cancelled<F: Future>(
    work: F,
    cancelled: impl Future<Output = ()>,
) -> Option<F::Output> {
    tokio::select! {
        r = work => Some(r),
        _ = cancelled => None,
    }
}

pub fn error_result(tool: &str, e: &Error) -> CallToolResult {
    let payload = envelope::failure(tool, e);
    let mut r = CallToolResult::structured_error(payload.clone());
    r.content = vec![Content::text(payload.to_string())];
    r
}

impl ServerHandler for AiStudioMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "AI-driven web extraction: scrape a page, crawl a site, drive a browser agent, or search the web. Pass output_format=json without a schema to have one generated from your prompt."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.as_ref().clone()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = request.name.to_string();
        let args = request.arguments.unwrap_or_default();

        let work = self.pipeline.invoke(&tool, &args);
        let Some(outcome) = until_cancelled(work, context.ct.cancelled()).await else {
            tracing::info!(tool = %tool, "call cancelled by client");
            return Err(McpError::internal_error("request cancelled", None));
        };

        match outcome {
            Ok(out) => Ok(tool_result(&out)),
            Err(Error::UnknownTool(name)) => Err(McpError::invalid_params(
                format!("unknown tool `{name}`"),
                None,
            )),
            Err(e) => {
                let code = envelope::ErrorCode::of(&e).as_str();
                tracing::debug!(tool = %tool, code, "tool call failed: {e}");
                Ok(error_result(&tool, &e))
            }
        }
    }
}

/// Serves MCP on stdin/stdout until the client disconnects.
pub async fn serve_stdio(pipeline: Pipeline) -> anyhow::Result<()> {
    let svc = AiStudioMcp::new(pipeline);
    tracing::info!(tools = svc.tools.len(), "serving MCP over stdio");
    let running = svc.serve(stdio()).await?;
    let reason = running.waiting().await?;
    tracing::info!(?reason, "stdio server stopped");
    Ok(())
}
