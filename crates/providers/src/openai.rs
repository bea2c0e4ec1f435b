use async_trait::async_trait;
use orbit_core::types::{Message, ProviderResponse, ToolCall, ToolSchema};
use orbit_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::client::{body_excerpt, build_http_client};
use crate::Provider;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// "Flat"-style backend: the system prompt stays an ordinary message, tool
/// calls are a top-level array on the assistant message, tool results are
/// separate tool-role messages, and arguments travel as JSON-encoded strings.
/// Also covers every OpenAI-compatible relay (set `api_base`).
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_http_client(timeout),
            api_key: api_key.to_string(),
            api_base: api_base
                .unwrap_or(OPENAI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// Serialize tool schemas to the OpenAI function format:
    /// `{ type: "function", function: { name, description, parameters } }`.
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

    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("openai/").unwrap_or(model)
    }
}

/// The internal `Message` already serializes to this wire shape: the custom
/// `ToolCall` serializer emits `function.arguments` as a JSON-encoded string.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded string on this wire format.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

impl WireToolCall {
    fn into_tool_call(self) -> ToolCall {
        let arguments: Value = serde_json::from_str(&self.function.arguments).unwrap_or_else(|e| {
            warn!(error = %e, raw = %self.function.arguments, "Failed to decode tool call arguments, using empty object");
            Value::Object(serde_json::Map::new())
        });
        ToolCall {
            id: self.id,
            name: self.function.name,
            arguments,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        model: Option<&str>,
    ) -> Result<ProviderResponse> {
        if self.api_key.is_empty() {
            return Err(Error::Auth("OpenAI API key is not configured".to_string()));
        }

        let url = format!("{}/chat/completions", self.api_base);
        let model = Self::normalize_model(model.unwrap_or(&self.model));
        let wire_tools = Self::convert_tools(tools);

        let request = ChatRequest {
            model,
            messages,
            tool_choice: if wire_tools.is_empty() { None } else { Some("auto") },
            tools: wire_tools,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        info!(
            url = %url,
            model = %model,
            tools_count = tools.len(),
            messages_count = messages.len(),
            "Calling OpenAI API"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            error!(status = %status, "OpenAI auth rejected");
            return Err(Error::Auth(format!(
                "OpenAI API rejected credentials ({}): {}",
                status,
                body_excerpt(&raw_body)
            )));
        }

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "OpenAI API error");
            return Err(Error::Protocol(format!(
                "OpenAI API error {}: {}",
                status,
                body_excerpt(&raw_body)
            )));
        }

        debug!(body_len = raw_body.len(), "OpenAI raw response");

        let chat_response: ChatResponse = serde_json::from_str(&raw_body).map_err(|e| {
            Error::Protocol(format!(
                "Failed to parse OpenAI response: {}. Body: {}",
                e,
                body_excerpt(&raw_body)
            ))
        })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Protocol("No choices in OpenAI response".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(WireToolCall::into_tool_call)
            .collect();

        let content = choice.message.content.filter(|c| !c.is_empty());

        info!(
            content_len = content.as_ref().map(|c| c.len()).unwrap_or(0),
            tool_calls_count = tool_calls.len(),
            "OpenAI response parsed"
        );

        Ok(ProviderResponse {
            content,
            tool_calls,
            input_tokens: chat_response.usage.as_ref().and_then(|u| u.prompt_tokens),
            output_tokens: chat_response.usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }
}
