use crate::backend::ExtractionBackend;
use crate::decide::{decide, Selection};
use crate::envelope::{wrap_failure, wrap_success, InvocationContext, ResultEnvelope};
use crate::normalize::normalize;
use crate::payload::{shape, BackendPayload};
use crate::registry::ToolRegistry;
use crate::{BackendError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything an invocation needs before the backend is called.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub selection: Selection,
    pub payload: BackendPayload,
    pub context: InvocationContext,
}

/// Lookup, normalize, decide and shape. No IO.
pub fn prepare(
    registry: &ToolRegistry,
    tool: &str,
    arguments: &Map<String, Value>,
) -> Result<Prepared> {
    let def = registry.lookup(tool)?;
    let selection = decide(normalize(def, arguments)?)?;
    let payload = shape(&selection);
    let context = InvocationContext::of(selection.operation, &selection.args);
    Ok(Prepared {
        selection,
        payload,
        context,
    })
}

/// Runs tool invocations end to end. Cheap to clone; invocations share nothing mutable.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    backend: Arc<dyn ExtractionBackend>,
    call_timeout: Duration,
}

impl Pipeline {
    pub fn new(registry: Arc<ToolRegistry>, backend: Arc<dyn ExtractionBackend>) -> Self {
        Self {
            registry,
            backend,
            call_timeout: crate::DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn invoke(&self, tool: &str, arguments: &Map<String, Value>) -> ResultEnvelope {
        let Prepared {
            selection,
            payload,
            context,
        } = prepare(&self.registry, tool, arguments)?;
        let operation = selection.operation;
        tracing::debug!(tool, operation = %operation, %context, "calling backend");

        let t0 = Instant::now();
        let outcome = match tokio::time::timeout(self.call_timeout, self.backend.execute(&payload))
            .await
        {
            Ok(r) => r,
            Err(_elapsed) => Err(BackendError::Timeout(self.call_timeout.as_millis() as u64)),
        };

        match outcome.and_then(|resp| wrap_success(operation, resp)) {
            Ok(out) => {
                tracing::debug!(
                    tool,
                    operation = %operation,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "backend call succeeded"
                );
                Ok(out)
            }
            Err(e) => Err(wrap_failure(operation.name(), &context, e)),
        }
    }
}
