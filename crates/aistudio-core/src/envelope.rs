use crate::decide::BackendOperation;
use crate::normalize::NormalizedArguments;
use crate::{BackendError, Error};
use serde_json::Value;
use std::fmt;

/// Outcome of one invocation: a tool output, or the error to report to the caller.
pub type ResultEnvelope = std::result::Result<ToolOutput, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Extracted content (text, structured value or base64 image), reported as `{"content": ..}`.
    Content(Value),
    /// Backend response passed through as-is.
    Raw(Value),
}

impl ToolOutput {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Content(c) => serde_json::json!({ "content": c }),
            Self::Raw(v) => v.clone(),
        }
    }

    /// The UTF-8 text document returned to the caller.
    pub fn to_text(&self) -> String {
        self.to_value().to_string()
    }
}

/// What an invocation was working on, for error messages and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationContext {
    Url(String),
    Query(String),
    App(&'static str),
}

impl InvocationContext {
    pub fn of(operation: BackendOperation, args: &NormalizedArguments) -> Self {
        match operation {
            BackendOperation::Search => Self::Query(args.text("query").unwrap_or_default().into()),
            BackendOperation::GenerateSchema(app) => Self::App(app.as_str()),
            _ => Self::Url(args.text("url").unwrap_or_default().into()),
        }
    }
}

impl fmt::Display for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(u) => write!(f, "url {u}"),
            Self::Query(q) => write!(f, "query {q:?}"),
            Self::App(a) => write!(f, "app {a}"),
        }
    }
}

/// Unwraps a successful backend response.
///
/// Extraction variants hand back the `data` field unchanged. A response without one is a
/// failure, never an empty success. Schema generation passes the response through whole.
pub fn wrap_success(
    operation: BackendOperation,
    response: Value,
) -> std::result::Result<ToolOutput, BackendError> {
    if let BackendOperation::GenerateSchema(_) = operation {
        return Ok(ToolOutput::Raw(response));
    }
    match response {
        Value::Object(mut m) => match m.remove("data") {
            Some(data) => Ok(ToolOutput::Content(data)),
            None => Err(BackendError::Decode(
                "response has no `data` field".to_string(),
            )),
        },
        other => Err(BackendError::Decode(format!(
            "expected a JSON object, got {}",
            crate::spec::kind_of(&other)
        ))),
    }
}

/// Logs a backend failure and turns it into the error reported for the invocation.
pub fn wrap_failure(operation: &str, context: &InvocationContext, error: BackendError) -> Error {
    tracing::error!(
        operation,
        context = %context,
        transient = error.is_transient(),
        "backend call failed: {error}"
    );
    Error::Backend {
        operation: operation.to_string(),
        context: context.clone(),
        source: error,
    }
}
