use async_trait::async_trait;
use orbit_core::types::{Message, ProviderResponse, ToolCall, ToolSchema};
use orbit_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::{body_excerpt, build_http_client};
use crate::Provider;

const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

/// "Local"-style backend: same top-level tool_calls array shape as the flat
/// wire format, but arguments arrive as native JSON objects and the backend
/// never emits a call id, so this adapter synthesizes one client-side for
/// the orchestrator to key tool results. No API key required.
pub struct OllamaProvider {
    client: Client,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_http_client(timeout),
            api_base: api_base
                .unwrap_or(DEFAULT_OLLAMA_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// Strip the "ollama/" prefix: config may store "ollama/llama3" but the
    /// API expects "llama3".
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("ollama/").unwrap_or(model)
    }

    /// Ollama accepts the OpenAI function envelope for tool schemas.
    fn convert_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect()
    }

    /// Flatten internal messages for the chat endpoint. Tool results keep the
    /// tool role; assistant tool-call structure is not echoed back, only its
    /// text content.
    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|msg| OllamaMessage {
                role: msg.role.clone(),
                content: msg.content.clone(),
            })
            .collect()
    }

    /// The backend omits call ids; synthesize sequential ones so the
    /// orchestrator can key tool results.
    fn parse_response(resp: OllamaChatResponse) -> ProviderResponse {
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        if let Some(native_calls) = &resp.message.tool_calls {
            for (i, tc) in native_calls.iter().enumerate() {
                if let Some(func) = &tc.function {
                    tool_calls.push(ToolCall {
                        id: format!("call_{}", i),
                        name: func.name.clone(),
                        arguments: func.arguments.clone(),
                    });
                }
            }
        }

        ProviderResponse {
            content: if resp.message.content.is_empty() {
                None
            } else {
                Some(resp.message.content.clone())
            },
            tool_calls,
            input_tokens: resp.prompt_eval_count,
            output_tokens: resp.eval_count,
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        model: Option<&str>,
    ) -> Result<ProviderResponse> {
        let url = format!("{}/api/chat", self.api_base);
        let model = Self::normalize_model(model.unwrap_or(&self.model));
        let converted = Self::convert_messages(messages);
        let converted_tools = Self::convert_tools(tools);

        let mut request = serde_json::json!({
            "model": model,
            "messages": converted,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            }
        });

        if !converted_tools.is_empty() {
            request["tools"] = Value::Array(converted_tools);
        }

        info!(
            url = %url,
            model = %model,
            tools_count = tools.len(),
            messages_count = messages.len(),
            "Calling Ollama API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Ollama API error");
            return Err(Error::Protocol(format!(
                "Ollama API error {}: {}",
                status,
                body_excerpt(&raw_body)
            )));
        }

        debug!(body_len = raw_body.len(), "Ollama raw response");

        let resp: OllamaChatResponse = serde_json::from_str(&raw_body).map_err(|e| {
            Error::Protocol(format!(
                "Failed to parse Ollama response: {}. Body: {}",
                e,
                body_excerpt(&raw_body)
            ))
        })?;

        let parsed = Self::parse_response(resp);

        info!(
            content_len = parsed.content.as_ref().map(|c| c.len()).unwrap_or(0),
            tool_calls_count = parsed.tool_calls.len(),
            "Ollama response parsed"
        );

        Ok(parsed)
    }
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: Option<OllamaFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    /// Native JSON object on this wire format, not a string.
    arguments: Value,
}
