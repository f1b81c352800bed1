use aistudio_core::{Error, ToolOutput};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidParams,
    InvalidToolArgument,
    UnknownTool,
    BackendFailed,
    NotConfigured,
    UnexpectedError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidToolArgument => "invalid_tool_argument",
            Self::UnknownTool => "unknown_tool",
            Self::BackendFailed => "backend_failed",
            Self::NotConfigured => "not_configured",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub fn of(e: &Error) -> Self {
        match e {
            Error::Validation { .. } => Self::InvalidParams,
            Error::InvalidToolArgument { .. } => Self::InvalidToolArgument,
            Error::UnknownTool(_) => Self::UnknownTool,
            Error::Backend { .. } => Self::BackendFailed,
            Error::NotConfigured(_) => Self::NotConfigured,
            Error::DuplicateTool(_) | Error::InvalidDefinition { .. } => Self::UnexpectedError,
        }
    }
}

/// Whether resending the same call unchanged may succeed.
pub fn retryable(e: &Error) -> bool {
    match e {
        Error::Backend { source, .. } => source.is_transient(),
        _ => false,
    }
}

fn hint(e: &Error) -> String {
    match e {
        Error::Validation { field, .. } => {
            format!("Fix `{field}` and call again; see the tool's input schema.")
        }
        Error::InvalidToolArgument { argument, .. } => format!(
            "`{argument}` must be one of: scrape (ai_scraper), crawl (ai_crawler), browser_agent."
        ),
        Error::UnknownTool(_) => "Call list_tools to see the available tools.".to_string(),
        Error::Backend { source, .. } if source.is_transient() => {
            "The extraction service failed transiently; retrying later may succeed.".to_string()
        }
        Error::Backend { .. } => {
            "The extraction service rejected the request. Check the API key and the arguments."
                .to_string()
        }
        Error::NotConfigured(_) => format!(
            "Set {} (or pass --api-key) and restart the server.",
            aistudio_client::API_KEY_ENV
        ),
        Error::DuplicateTool(_) | Error::InvalidDefinition { .. } => String::new(),
    }
}

/// `{code, message, hint, retryable}` describing one failure.
pub fn error_obj(e: &Error) -> Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let code = ErrorCode::of(e).as_str();
    let obj = ErrorObject {
        code,
        message: e.to_string(),
        hint: hint(e),
        retryable: retryable(e),
    };
    serde_json::to_value(obj).unwrap_or_else(|_| {
        json!({ "code": code, "message": e.to_string(), "hint": hint(e), "retryable": retryable(e) })
    })
}

/// Payload reported for a failed tool call.
pub fn failure(tool: &str, e: &Error) -> Value {
    json!({ "ok": false, "tool": tool, "error": error_obj(e) })
}

/// One line of `aistudio call` output for a successful call.
pub fn success(tool: &str, out: &ToolOutput) -> Value {
    json!({ "ok": true, "tool": tool, "result": out.to_value() })
}
