//! The seam between the engine and the remote model endpoints.

use runway_api::{ApiError, RunwayClient};
use serde_json::Value;

/// Remote calls a model descriptor and its invocation engines depend on.
///
/// [`RunwayClient`] is the production implementation. Tests substitute
/// in-process fakes.
pub trait ModelTransport: Send + Sync {
    /// Fetch the metadata document from `{base}info`.
    fn fetch_info(&self) -> Result<Value, ApiError>;

    /// Run the model on `payload` via `{base}query`.
    fn query(&self, payload: &Value) -> Result<Value, ApiError>;
}

impl ModelTransport for RunwayClient {
    fn fetch_info(&self) -> Result<Value, ApiError> {
        RunwayClient::fetch_info(self)
    }

    fn query(&self, payload: &Value) -> Result<Value, ApiError> {
        RunwayClient::query(self, payload)
    }
}
