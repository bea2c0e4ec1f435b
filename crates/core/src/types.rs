use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A tool call request that serializes to the OpenAI-compatible format:
/// `{id, type: "function", function: {name, arguments}}`
/// with `arguments` as a JSON-encoded string on the wire and a native
/// JSON object in memory.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl Serialize for ToolCall {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &serde_json::json!({
            "name": self.name,
            "arguments": self.arguments.to_string()
        }))?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ToolCall {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| serde::de::Error::custom("expected object"))?;

        let id = obj.get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        // Wire format: {id, type, function: {name, arguments}}
        if let Some(func) = obj.get("function").and_then(|v| v.as_object()) {
            let name = func.get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let arguments = match func.get("arguments") {
                Some(Value::String(s)) => {
                    serde_json::from_str(s).unwrap_or_else(|e| {
                        warn!(error = %e, raw = %s, "Failed to parse tool call arguments as JSON, using empty object");
                        Value::Object(serde_json::Map::new())
                    })
                }
                Some(v) => v.clone(),
                None => Value::Object(serde_json::Map::new()),
            };
            return Ok(ToolCall { id, name, arguments });
        }

        // Flat format: {id, name, arguments}
        let name = obj.get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = obj.get("arguments")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));

        Ok(ToolCall { id, name, arguments })
    }
}

/// One entry in a conversation transcript. Tool calls appear only on
/// assistant messages; `tool_call_id` only on tool messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_with_calls(content: &str, calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }
}

/// Static tool metadata, declared once per tool. Each provider adapter owns
/// the serialization of this into its backend's request shape.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Normalized adapter output. No backend-specific JSON crosses this boundary.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// One persisted thread of messages, keyed by an id supplied by the
/// originating channel so external channels resume the same thread.
/// Messages are append-only; linked atoms stay deduplicated in first-seen
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub channel: String,
    messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    linked_atoms: Vec<String>,
}

impl Conversation {
    pub fn new(id: &str, channel: &str) -> Self {
        Self {
            id: id.to_string(),
            channel: channel.to_string(),
            messages: Vec::new(),
            summary: None,
            linked_atoms: Vec::new(),
        }
    }

    /// Rebuild a conversation from persisted parts.
    pub fn from_parts(
        id: String,
        channel: String,
        summary: Option<String>,
        linked_atoms: Vec<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self { id, channel, messages, summary, linked_atoms }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Record an atom touched by this conversation. Returns false when the
    /// id was already linked.
    pub fn link_atom(&mut self, atom_id: &str) -> bool {
        if self.linked_atoms.iter().any(|a| a == atom_id) {
            return false;
        }
        self.linked_atoms.push(atom_id.to_string());
        true
    }

    pub fn linked_atoms(&self) -> &[String] {
        &self.linked_atoms
    }
}

/// The collaborator's generic persisted entity: idea, task, project, note,
/// research, journal entry, focus session, workout. Opaque to the
/// orchestrator beyond id/type/title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    pub id: String,
    pub atom_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Fields for a new atom; the store assigns id and created_at.
#[derive(Debug, Clone, Default)]
pub struct AtomDraft {
    pub atom_type: String,
    pub title: String,
    pub body: Option<String>,
    pub project: Option<String>,
    pub phase: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub metadata: Value,
}

impl AtomDraft {
    pub fn new(atom_type: &str, title: &str) -> Self {
        Self {
            atom_type: atom_type.to_string(),
            title: title.to_string(),
            metadata: Value::Null,
            ..Default::default()
        }
    }
}

/// Partial update; `Some` fields overwrite, `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct AtomPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub project: Option<String>,
    pub phase: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_wire_roundtrip() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "create_atom".to_string(),
            arguments: serde_json::json!({"atomType": "idea", "title": "launch campaign"}),
        };

        let wire = serde_json::to_value(&call).unwrap();
        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "create_atom");
        // Arguments travel as a JSON-encoded string
        assert!(wire["function"]["arguments"].is_string());

        let back: ToolCall = serde_json::from_value(wire).unwrap();
        assert_eq!(back.id, "call_1");
        assert_eq!(back.name, "create_atom");
        assert_eq!(back.arguments["title"], "launch campaign");
    }

    #[test]
    fn test_tool_call_flat_format() {
        let flat = serde_json::json!({
            "id": "call_2",
            "name": "search_atoms",
            "arguments": {"query": "writing"}
        });
        let call: ToolCall = serde_json::from_value(flat).unwrap();
        assert_eq!(call.name, "search_atoms");
        assert_eq!(call.arguments["query"], "writing");
    }

    #[test]
    fn test_tool_call_bad_argument_string_falls_back_to_empty() {
        let wire = serde_json::json!({
            "id": "call_3",
            "type": "function",
            "function": {"name": "create_atom", "arguments": "not json"}
        });
        let call: ToolCall = serde_json::from_value(wire).unwrap();
        assert!(call.arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::tool_result("call_1", "{\"success\":true}");
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(msg.tool_calls.is_none());

        let msg = Message::assistant_with_calls("", vec![]);
        assert_eq!(msg.role, "assistant");
        assert!(msg.tool_calls.is_some());
    }

    #[test]
    fn test_conversation_append_only_order() {
        let mut conv = Conversation::new("c1", "app");
        conv.push(Message::user("first"));
        conv.push(Message::assistant("second"));
        conv.push(Message::user("third"));

        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_conversation_link_atom_dedup() {
        let mut conv = Conversation::new("c1", "app");
        assert!(conv.link_atom("abc"));
        assert!(!conv.link_atom("abc"));
        assert!(conv.link_atom("def"));
        assert_eq!(conv.linked_atoms(), &["abc".to_string(), "def".to_string()]);
    }

    #[test]
    fn test_conversation_serde_roundtrip() {
        let mut conv = Conversation::new("tg:42", "telegram");
        conv.push(Message::user("hello"));
        conv.link_atom("a-1");

        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "tg:42");
        assert_eq!(back.channel, "telegram");
        assert_eq!(back.messages().len(), 1);
        assert_eq!(back.linked_atoms(), &["a-1".to_string()]);
    }
}
