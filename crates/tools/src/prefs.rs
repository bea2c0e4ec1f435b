use async_trait::async_trait;
use orbit_core::types::ToolSchema;
use orbit_core::{Error, Result};
use serde_json::{json, Map, Value};

use crate::{optional_str, require_str, Stores, Tool};

/// Read every stored preference.
pub struct GetPreferencesTool;

#[async_trait]
impl Tool for GetPreferencesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_preferences",
            description: "List all stored user preferences (scoped key/value pairs).",
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, stores: &Stores, _params: Value) -> Result<Value> {
        let mut prefs = Map::new();
        for (key, value) in stores.prefs.all().await? {
            prefs.insert(key, Value::String(value));
        }
        Ok(json!({
            "success": true,
            "count": prefs.len(),
            "preferences": prefs,
        }))
    }
}

/// Set or overwrite one preference.
pub struct SetPreferenceTool;

#[async_trait]
impl Tool for SetPreferenceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "set_preference",
            description: "Set a user preference under a scoped key, e.g. assistant.tone = direct.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string", "description": "Scoped key (e.g. assistant.tone)"},
                    "value": {"type": "string", "description": "Preference value"}
                },
                "required": ["key", "value"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "key")?;
        require_str(params, "value")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let key = require_str(&params, "key")?;
        let value = require_str(&params, "value")?;
        stores.prefs.set(key, value).await?;
        Ok(json!({
            "success": true,
            "key": key,
            "value": value,
        }))
    }
}

/// Remove a preference; gated behind confirmation.
pub struct DeletePreferenceTool;

#[async_trait]
impl Tool for DeletePreferenceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "delete_preference",
            description: "Delete a stored preference by key. Cannot be undone; the user must approve it.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string", "description": "Scoped key to delete"},
                    "confirmed": {"type": "boolean", "description": "Set by the confirmation flow; do not set yourself"}
                },
                "required": ["key"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "key")?;
        Ok(())
    }

    fn irreversible(&self) -> bool {
        true
    }

    fn confirm_description(&self, params: &Value) -> String {
        let key = optional_str(params, "key").unwrap_or("?");
        format!("Delete preference {}", key)
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let key = require_str(&params, "key")?;
        if stores.prefs.delete(key).await? {
            Ok(json!({"success": true, "key": key, "deleted": true}))
        } else {
            Err(Error::NotFound(format!("Preference not found: {}", key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_preference_validate() {
        let tool = SetPreferenceTool;
        assert!(tool.validate(&json!({"key": "assistant.tone", "value": "direct"})).is_ok());
        assert!(tool.validate(&json!({"key": "assistant.tone"})).is_err());
    }

    #[test]
    fn test_delete_preference_is_irreversible() {
        let tool = DeletePreferenceTool;
        assert!(tool.irreversible());
        assert!(tool
            .confirm_description(&json!({"key": "assistant.tone"}))
            .contains("assistant.tone"));
    }
}
