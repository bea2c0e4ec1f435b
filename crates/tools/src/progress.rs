use async_trait::async_trait;
use orbit_core::types::{AtomDraft, ToolSchema};
use orbit_core::Result;
use serde_json::{json, Value};

use crate::{optional_str, optional_u32, require_str, Stores, Tool};

/// Wrap a quest-engine payload in the flat success envelope the loop expects.
fn with_success(payload: Value) -> Value {
    match payload {
        Value::Object(mut obj) => {
            obj.entry("success").or_insert(Value::Bool(true));
            Value::Object(obj)
        }
        other => json!({"success": true, "result": other}),
    }
}

/// Progress/level queries against the quest engine.
pub struct QueryProgressTool;

#[async_trait]
impl Tool for QueryProgressTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "query_progress",
            description: "Query the progress system: current level, streaks, quest status, or a single dimension's status.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query_type": {
                        "type": "string",
                        "enum": ["overview", "level", "streak", "quests", "dimension_status"],
                        "description": "What to evaluate"
                    },
                    "dimension": {
                        "type": "string",
                        "description": "Dimension name, for dimension_status"
                    }
                },
                "required": ["query_type"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "query_type")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let query_type = require_str(&params, "query_type")?;
        let dimension = optional_str(&params, "dimension");
        let payload = stores.quests.evaluate(query_type, dimension).await?;
        Ok(with_success(payload))
    }
}

/// Manual quest completion; gated behind confirmation since it awards
/// progress that cannot be taken back.
pub struct CompleteQuestTool;

#[async_trait]
impl Tool for CompleteQuestTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "complete_quest",
            description: "Mark a quest as completed manually. Awards its progress; the user must approve it.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "quest_id": {"type": "string", "description": "Quest to complete"},
                    "confirmed": {"type": "boolean", "description": "Set by the confirmation flow; do not set yourself"}
                },
                "required": ["quest_id"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "quest_id")?;
        Ok(())
    }

    fn irreversible(&self) -> bool {
        true
    }

    fn confirm_description(&self, params: &Value) -> String {
        let quest_id = optional_str(params, "quest_id").unwrap_or("?");
        format!("Manually complete quest {}", quest_id)
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let quest_id = require_str(&params, "quest_id")?;
        let payload = stores.quests.manual_complete(quest_id).await?;
        Ok(with_success(payload))
    }
}

/// Log a workout as an atom.
pub struct LogWorkoutTool;

#[async_trait]
impl Tool for LogWorkoutTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "log_workout",
            description: "Log a workout (run, lift, yoga, ...) with optional duration and notes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "workout_type": {"type": "string", "description": "Kind of workout"},
                    "duration_minutes": {"type": "integer"},
                    "notes": {"type": "string"}
                },
                "required": ["workout_type"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "workout_type")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let workout_type = require_str(&params, "workout_type")?;

        let mut draft = AtomDraft::new("workout", workout_type);
        draft.body = optional_str(&params, "notes").map(String::from);
        draft.duration_minutes = optional_u32(&params, "duration_minutes");
        draft.scheduled_at = Some(chrono::Utc::now());

        let atom = stores.atoms.create(draft).await?;
        Ok(json!({
            "success": true,
            "uuid": atom.id,
            "workout_type": workout_type,
            "duration_minutes": atom.duration_minutes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_success_preserves_payload_fields() {
        let wrapped = with_success(json!({"level": 7, "streak": 12}));
        assert_eq!(wrapped["success"], true);
        assert_eq!(wrapped["level"], 7);

        // Existing success flag is not overwritten
        let wrapped = with_success(json!({"success": false, "reason": "locked"}));
        assert_eq!(wrapped["success"], false);

        // Non-object payloads get nested
        let wrapped = with_success(json!([1, 2]));
        assert_eq!(wrapped["success"], true);
        assert_eq!(wrapped["result"][0], 1);
    }

    #[test]
    fn test_complete_quest_is_irreversible() {
        let tool = CompleteQuestTool;
        assert!(tool.irreversible());
        assert!(tool
            .confirm_description(&json!({"quest_id": "q-7"}))
            .contains("q-7"));
    }

    #[test]
    fn test_log_workout_validate() {
        let tool = LogWorkoutTool;
        assert!(tool.validate(&json!({"workout_type": "run"})).is_ok());
        assert!(tool.validate(&json!({})).is_err());
    }
}
