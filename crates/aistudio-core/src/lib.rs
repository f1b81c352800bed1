//! Validation and shaping pipeline for the AI Studio extraction tools.
//!
//! A tool call flows through: registry lookup, [`normalize`], [`decide`], [`shape`],
//! the [`ExtractionBackend`], and finally the envelope builders in [`envelope`].
//! Everything here except the backend call itself is a pure transformation.

use std::time::Duration;

pub mod backend;
pub mod decide;
pub mod envelope;
pub mod normalize;
pub mod payload;
pub mod pipeline;
pub mod registry;
pub mod spec;
pub mod tools;

pub use backend::ExtractionBackend;
pub use decide::{decide, wants_derived_schema, App, BackendOperation, OutputFormat, Selection};
pub use envelope::{wrap_failure, wrap_success, InvocationContext, ResultEnvelope, ToolOutput};
pub use normalize::{normalize, NormalizedArguments};
pub use payload::{shape, BackendPayload};
pub use pipeline::{prepare, Pipeline, Prepared};
pub use registry::ToolRegistry;
pub use spec::{ArgType, ArgumentSpec, ToolDefinition};

/// Default production endpoint of the extraction service.
pub const DEFAULT_API_URL: &str = "https://api-aistudio.oxylabs.io";

/// Ceiling for a single backend call. Crawls and browser sessions are slow.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(240_000);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
    #[error("invalid definition for tool `{tool}`: {reason}")]
    InvalidDefinition { tool: String, reason: String },
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid argument `{field}`: {reason}")]
    Validation { field: String, reason: String },
    #[error("invalid {argument} `{value}` for {tool}")]
    InvalidToolArgument {
        tool: String,
        argument: String,
        value: String,
    },
    #[error("{operation} failed for {context}: {source}")]
    Backend {
        operation: String,
        context: InvocationContext,
        #[source]
        source: BackendError,
    },
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl Error {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by the remote extraction service or the transport to it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether the same request may succeed if sent again unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BackendError::Transport("reset".into()).is_transient());
        assert!(BackendError::Timeout(10).is_transient());
        assert!(BackendError::Status {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(BackendError::Status {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(!BackendError::Status {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!BackendError::Decode("not json".into()).is_transient());
    }

    #[test]
    fn backend_error_message_names_operation_and_context() {
        let e = Error::Backend {
            operation: "scrape".into(),
            context: InvocationContext::Url("https://example.com".into()),
            source: BackendError::Status {
                status: 502,
                message: "bad gateway".into(),
            },
        };
        let s = e.to_string();
        assert!(s.contains("scrape"));
        assert!(s.contains("https://example.com"));
        assert!(s.contains("502"));
    }
}
