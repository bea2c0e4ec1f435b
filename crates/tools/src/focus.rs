use async_trait::async_trait;
use chrono::Utc;
use orbit_core::types::{Atom, AtomDraft, AtomPatch, ToolSchema};
use orbit_core::{Error, Result};
use serde_json::{json, Value};

use crate::{optional_u32, Stores, Tool};

const FOCUS_TYPE: &str = "focus_session";
const DEFAULT_DURATION_MINUTES: u32 = 90;
const POMODORO_MINUTES: u32 = 25;

/// The one focus session that is currently running, if any.
async fn open_session(stores: &Stores) -> Result<Option<Atom>> {
    let sessions = stores.atoms.list(Some(FOCUS_TYPE)).await?;
    Ok(sessions.into_iter().rev().find(|s| !s.completed))
}

/// Start a deep-work session.
pub struct StartDeepWorkTool;

#[async_trait]
impl Tool for StartDeepWorkTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "start_deep_work",
            description: "Start a deep work session. Default 90 minutes; pomodoro mode uses 25.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "duration_minutes": {"type": "integer", "description": "Session length"},
                    "pomodoro_mode": {"type": "boolean", "description": "25-minute pomodoro session"}
                },
                "required": []
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        if let Some(open) = open_session(stores).await? {
            return Err(Error::Tool(format!(
                "A focus session is already running (started {})",
                open.scheduled_at.map(|t| t.to_rfc3339()).unwrap_or_default()
            )));
        }

        let pomodoro = params
            .get("pomodoro_mode")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let duration = optional_u32(&params, "duration_minutes")
            .unwrap_or(if pomodoro { POMODORO_MINUTES } else { DEFAULT_DURATION_MINUTES });

        let mut draft = AtomDraft::new(FOCUS_TYPE, "Deep work");
        draft.scheduled_at = Some(Utc::now());
        draft.duration_minutes = Some(duration);
        if pomodoro {
            draft.metadata = json!({"pomodoro": true});
        }

        let atom = stores.atoms.create(draft).await?;
        Ok(json!({
            "success": true,
            "uuid": atom.id,
            "duration_minutes": duration,
            "pomodoro": pomodoro,
        }))
    }
}

/// End the running session.
pub struct StopDeepWorkTool;

#[async_trait]
impl Tool for StopDeepWorkTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "stop_deep_work",
            description: "Stop the running deep work session.",
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
        let open = open_session(stores)
            .await?
            .ok_or_else(|| Error::NotFound("No focus session is running".to_string()))?;

        let patch = AtomPatch {
            completed: Some(true),
            ..Default::default()
        };
        stores.atoms.update(&open.id, patch).await?;

        Ok(json!({
            "success": true,
            "uuid": open.id,
            "stopped": true,
        }))
    }
}

/// Add time to the running session.
pub struct ExtendDeepWorkTool;

#[async_trait]
impl Tool for ExtendDeepWorkTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "extend_deep_work",
            description: "Extend the running deep work session by a number of minutes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "additional_minutes": {"type": "integer", "description": "Minutes to add"}
                },
                "required": ["additional_minutes"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        match optional_u32(params, "additional_minutes") {
            Some(n) if n > 0 => Ok(()),
            _ => Err(Error::Tool(
                "additional_minutes must be a positive integer".to_string(),
            )),
        }
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let additional = optional_u32(&params, "additional_minutes")
            .ok_or_else(|| Error::Tool("Missing required parameter: additional_minutes".to_string()))?;

        let open = open_session(stores)
            .await?
            .ok_or_else(|| Error::NotFound("No focus session is running".to_string()))?;

        let new_duration = open.duration_minutes.unwrap_or(0) + additional;
        let patch = AtomPatch {
            duration_minutes: Some(new_duration),
            ..Default::default()
        };
        stores.atoms.update(&open.id, patch).await?;

        Ok(json!({
            "success": true,
            "uuid": open.id,
            "duration_minutes": new_duration,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_deep_work_schema() {
        let schema = StartDeepWorkTool.schema();
        assert_eq!(schema.name, "start_deep_work");
        assert!(!StartDeepWorkTool.irreversible());
    }

    #[test]
    fn test_extend_validate_rejects_zero() {
        let tool = ExtendDeepWorkTool;
        assert!(tool.validate(&json!({"additional_minutes": 0})).is_err());
        assert!(tool.validate(&json!({})).is_err());
        assert!(tool.validate(&json!({"additional_minutes": 15})).is_ok());
    }
}
