use super::types::{ModelRequest, ModelResponse};
use crate::error::ModelCallError;
use std::future::Future;
use std::pin::Pin;

pub type ModelFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ModelResponse, ModelCallError>> + Send + 'a>>;

/// A remote model service. One call per request; retries belong to the
/// invoker, never to the client.
pub trait ModelClient: Send + Sync {
    /// Client identifier (e.g. "openai-compatible", "echo").
    fn name(&self) -> &str;

    fn complete<'a>(&'a self, request: ModelRequest<'a>) -> ModelFuture<'a>;
}
