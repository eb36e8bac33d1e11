use async_trait::async_trait;

use crate::errors::UpstreamError;

use super::types::GenerateRequest;

/// Model client interface used by conversation sessions.
///
/// Implementations are stateless with respect to conversations: the caller
/// owns the history and sends it in full on every call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Run one generation and return the reply text.
    async fn generate(&self, req: GenerateRequest) -> Result<String, UpstreamError>;
}
