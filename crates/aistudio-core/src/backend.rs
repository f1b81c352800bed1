use crate::payload::BackendPayload;
use crate::BackendError;
use serde_json::Value;

/// The remote extraction service.
///
/// Implementations own transport concerns (auth, per-request timeouts, retries); callers
/// only see the final outcome.
#[async_trait::async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn execute(&self, payload: &BackendPayload) -> Result<Value, BackendError>;
}
