pub mod anthropic;
pub mod client;
pub mod factory;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use orbit_core::types::{Message, ProviderResponse, ToolSchema};
use orbit_core::Result;

/// One chat-completion backend. A call maps the internal message list into
/// the backend's request shape, performs exactly one outbound HTTP request,
/// and parses the response back. No internal retry; resilience belongs to
/// the caller. `model` overrides the configured model for this call only.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        model: Option<&str>,
    ) -> Result<ProviderResponse>;
}

pub use anthropic::AnthropicProvider;
pub use factory::{create_provider, infer_backend_from_model};
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
