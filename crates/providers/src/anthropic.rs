use async_trait::async_trait;
use orbit_core::types::{Message, ProviderResponse, ToolCall, ToolSchema};
use orbit_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::{body_excerpt, build_http_client};
use crate::Provider;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// "Blocks"-style backend: system prompt is a top-level field, tool requests
/// are typed content blocks inside the assistant message, and tool results go
/// back as user-role tool_result blocks keyed by call id.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
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
                .unwrap_or(ANTHROPIC_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// Serialize tool schemas to the Anthropic tool format:
    /// `{ name, description, input_schema }`.
    fn convert_tools(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters,
                })
            })
            .collect()
    }

    /// Convert the internal message list to Anthropic format.
    /// The system prompt becomes a separate top-level parameter; only
    /// `user`/`assistant` roles remain. Tool results are user messages with
    /// `tool_result` content blocks.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system_text: Option<String> = None;
        let mut converted: Vec<Value> = Vec::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" => {
                    system_text = Some(match system_text {
                        Some(existing) => format!("{}\n\n{}", existing, msg.content),
                        None => msg.content.clone(),
                    });
                }
                "assistant" => {
                    let mut blocks: Vec<Value> = Vec::new();

                    if !msg.content.is_empty() {
                        blocks.push(serde_json::json!({
                            "type": "text",
                            "text": msg.content,
                        }));
                    }

                    if let Some(tool_calls) = &msg.tool_calls {
                        for tc in tool_calls {
                            blocks.push(serde_json::json!({
                                "type": "tool_use",
                                "id": tc.id,
                                "name": tc.name,
                                "input": tc.arguments,
                            }));
                        }
                    }

                    if blocks.is_empty() {
                        blocks.push(serde_json::json!({"type": "text", "text": ""}));
                    }

                    converted.push(serde_json::json!({
                        "role": "assistant",
                        "content": blocks,
                    }));
                }
                "tool" => {
                    let block = serde_json::json!({
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.as_deref().unwrap_or(""),
                        "content": msg.content,
                    });

                    // Consecutive tool results share one user message
                    if let Some(last) = converted.last_mut() {
                        if last.get("role").and_then(|v| v.as_str()) == Some("user") {
                            if let Some(arr) = last.get_mut("content").and_then(|c| c.as_array_mut()) {
                                if arr.first()
                                    .and_then(|v| v.get("type"))
                                    .and_then(|v| v.as_str())
                                    == Some("tool_result")
                                {
                                    arr.push(block);
                                    continue;
                                }
                            }
                        }
                    }

                    converted.push(serde_json::json!({
                        "role": "user",
                        "content": [block],
                    }));
                }
                // "user" and anything unrecognized
                _ => {
                    converted.push(serde_json::json!({
                        "role": "user",
                        "content": msg.content,
                    }));
                }
            }
        }

        (system_text, Self::merge_consecutive_roles(converted))
    }

    /// Merge consecutive messages with the same role (the backend requires
    /// alternating user/assistant messages).
    fn merge_consecutive_roles(messages: Vec<Value>) -> Vec<Value> {
        let mut result: Vec<Value> = Vec::new();

        for msg in messages {
            let role = msg.get("role").and_then(|v| v.as_str()).unwrap_or("");
            let last_role = result
                .last()
                .and_then(|v| v.get("role"))
                .and_then(|v| v.as_str())
                .unwrap_or("");

            if role == last_role && !result.is_empty() {
                if let Some(last) = result.last_mut() {
                    let last_content = last.get("content").cloned().unwrap_or(Value::Null);
                    let new_content = msg.get("content").cloned().unwrap_or(Value::Null);

                    let merged = match (last_content, new_content) {
                        (Value::Array(mut a), Value::Array(b)) => {
                            a.extend(b);
                            Value::Array(a)
                        }
                        (Value::Array(mut a), Value::String(s)) => {
                            a.push(serde_json::json!({"type": "text", "text": s}));
                            Value::Array(a)
                        }
                        (Value::String(s1), Value::String(s2)) => {
                            Value::String(format!("{}\n\n{}", s1, s2))
                        }
                        (Value::String(s), Value::Array(mut a)) => {
                            let mut arr = vec![serde_json::json!({"type": "text", "text": s})];
                            arr.append(&mut a);
                            Value::Array(arr)
                        }
                        (existing, _new) => existing,
                    };

                    last["content"] = merged;
                }
            } else {
                result.push(msg);
            }
        }

        result
    }

    /// Strip the "anthropic/" prefix: config may store
    /// "anthropic/claude-sonnet-4-20250514" but the API expects the bare id.
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("anthropic/").unwrap_or(model)
    }

    /// Walk the content blocks, collecting text parts and tool_use entries.
    fn parse_response(resp: AnthropicResponse) -> ProviderResponse {
        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        for block in &resp.content {
            match block.block_type.as_str() {
                "text" => {
                    if let Some(text) = &block.text {
                        if !text.is_empty() {
                            text_parts.push(text.clone());
                        }
                    }
                }
                "tool_use" => {
                    if let (Some(id), Some(name)) = (&block.id, &block.name) {
                        tool_calls.push(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: block
                                .input
                                .clone()
                                .unwrap_or(Value::Object(serde_json::Map::new())),
                        });
                    }
                }
                _ => {}
            }
        }

        ProviderResponse {
            content: if text_parts.is_empty() {
                None
            } else {
                Some(text_parts.join("\n"))
            },
            tool_calls,
            input_tokens: resp.usage.as_ref().and_then(|u| u.input_tokens),
            output_tokens: resp.usage.as_ref().and_then(|u| u.output_tokens),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        model: Option<&str>,
    ) -> Result<ProviderResponse> {
        if self.api_key.is_empty() {
            return Err(Error::Auth("Anthropic API key is not configured".to_string()));
        }

        let url = format!("{}/messages", self.api_base);
        let model = Self::normalize_model(model.unwrap_or(&self.model));

        let (system, converted) = Self::convert_messages(messages);
        let converted_tools = Self::convert_tools(tools);

        let mut request = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": converted,
        });

        if let Some(sys) = &system {
            request["system"] = Value::String(sys.clone());
        }

        if !converted_tools.is_empty() {
            request["tools"] = Value::Array(converted_tools);
        }

        info!(
            url = %url,
            model = %model,
            tools_count = tools.len(),
            messages_count = messages.len(),
            "Calling Anthropic API"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            error!(status = %status, "Anthropic auth rejected");
            return Err(Error::Auth(format!(
                "Anthropic API rejected credentials ({}): {}",
                status,
                body_excerpt(&raw_body)
            )));
        }

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Anthropic API error");
            return Err(Error::Protocol(format!(
                "Anthropic API error {}: {}",
                status,
                body_excerpt(&raw_body)
            )));
        }

        debug!(body_len = raw_body.len(), "Anthropic raw response");

        let resp: AnthropicResponse = serde_json::from_str(&raw_body).map_err(|e| {
            Error::Protocol(format!(
                "Failed to parse Anthropic response: {}. Body: {}",
                e,
                body_excerpt(&raw_body)
            ))
        })?;

        let parsed = Self::parse_response(resp);

        info!(
            content_len = parsed.content.as_ref().map(|c| c.len()).unwrap_or(0),
            tool_calls_count = parsed.tool_calls.len(),
            "Anthropic response parsed"
        );

        Ok(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &'static str) -> ToolSchema {
        ToolSchema {
            name,
            description: "test tool",
            parameters: serde_json::json!({
                "type": "object",
                "properties": {"title": {"type": "string"}},
                "required": ["title"]
            }),
        }
    }

    #[test]
    fn test_convert_tools() {
        let converted = AnthropicProvider::convert_tools(&[schema("create_atom")]);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0]["name"], "create_atom");
        assert!(converted[0]["input_schema"].is_object());
        assert!(converted[0].get("function").is_none());
    }

    #[test]
    fn test_convert_messages_system_extraction() {
        let messages = vec![
            Message::system("You are Orbit"),
            Message::user("Hello"),
        ];

        let (system, msgs) = AnthropicProvider::convert_messages(&messages);
        assert_eq!(system, Some("You are Orbit".to_string()));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["role"], "user");
    }

    #[test]
    fn test_convert_messages_tool_results_become_user_blocks() {
        let assistant = Message::assistant_with_calls(
            "",
            vec![ToolCall {
                id: "toolu_1".to_string(),
                name: "create_atom".to_string(),
                arguments: serde_json::json!({"atomType": "idea", "title": "x"}),
            }],
        );

        let messages = vec![
            Message::system("sys"),
            Message::user("capture an idea"),
            assistant,
            Message::tool_result("toolu_1", "{\"success\":true,\"uuid\":\"a1\"}"),
        ];

        let (system, msgs) = AnthropicProvider::convert_messages(&messages);
        assert_eq!(system, Some("sys".to_string()));
        assert_eq!(msgs.len(), 3); // user, assistant, user(tool_result)

        let assistant_content = msgs[1]["content"].as_array().unwrap();
        assert_eq!(assistant_content[0]["type"], "tool_use");
        assert_eq!(assistant_content[0]["name"], "create_atom");

        let user_content = msgs[2]["content"].as_array().unwrap();
        assert_eq!(user_content[0]["type"], "tool_result");
        assert_eq!(user_content[0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_consecutive_tool_results_merge_into_one_user_message() {
        let assistant = Message::assistant_with_calls(
            "",
            vec![
                ToolCall {
                    id: "toolu_1".to_string(),
                    name: "create_atom".to_string(),
                    arguments: serde_json::json!({"title": "a"}),
                },
                ToolCall {
                    id: "toolu_2".to_string(),
                    name: "create_atom".to_string(),
                    arguments: serde_json::json!({"title": "b"}),
                },
            ],
        );

        let messages = vec![
            Message::user("two atoms"),
            assistant,
            Message::tool_result("toolu_1", "{\"success\":true}"),
            Message::tool_result("toolu_2", "{\"success\":true}"),
        ];

        let (_, msgs) = AnthropicProvider::convert_messages(&messages);
        assert_eq!(msgs.len(), 3);
        let results = msgs[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["tool_use_id"], "toolu_2");
    }

    #[test]
    fn test_merge_consecutive_roles() {
        let messages = vec![
            serde_json::json!({"role": "user", "content": "hello"}),
            serde_json::json!({"role": "user", "content": "world"}),
            serde_json::json!({"role": "assistant", "content": "hi"}),
        ];

        let merged = AnthropicProvider::merge_consecutive_roles(messages);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["content"], "hello\n\nworld");
    }

    #[test]
    fn test_parse_response_preserves_all_tool_use_blocks() {
        let json = r#"{
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "On it."},
                {"type": "tool_use", "id": "toolu_1", "name": "create_atom", "input": {"atomType": "idea", "title": "one"}},
                {"type": "tool_use", "id": "toolu_2", "name": "schedule_block", "input": {"title": "two", "durationMinutes": 30}},
                {"type": "tool_use", "id": "toolu_3", "name": "search_atoms", "input": {"query": "three"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 45}
        }"#;

        let resp: AnthropicResponse = serde_json::from_str(json).unwrap();
        let parsed = AnthropicProvider::parse_response(resp);

        assert_eq!(parsed.content.as_deref(), Some("On it."));
        assert_eq!(parsed.tool_calls.len(), 3);
        assert_eq!(parsed.tool_calls[0].name, "create_atom");
        assert_eq!(parsed.tool_calls[0].arguments["title"], "one");
        assert_eq!(parsed.tool_calls[1].id, "toolu_2");
        assert_eq!(parsed.tool_calls[1].arguments["durationMinutes"], 30);
        assert_eq!(parsed.tool_calls[2].name, "search_atoms");
        assert_eq!(parsed.input_tokens, Some(120));
        assert_eq!(parsed.output_tokens, Some(45));
    }

    #[test]
    fn test_normalize_model() {
        assert_eq!(
            AnthropicProvider::normalize_model("anthropic/claude-sonnet-4-20250514"),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(
            AnthropicProvider::normalize_model("claude-3-5-haiku-20241022"),
            "claude-3-5-haiku-20241022"
        );
    }
}
