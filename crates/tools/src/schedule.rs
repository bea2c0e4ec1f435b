use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use orbit_core::types::{AtomDraft, ToolSchema};
use orbit_core::{Error, Result};
use serde_json::{json, Value};

use crate::{optional_str, optional_u32, require_str, Stores, Tool};

/// Create a timed block on the schedule (a task atom with a start time).
pub struct ScheduleBlockTool;

#[async_trait]
impl Tool for ScheduleBlockTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "schedule_block",
            description: "Schedule a time block: a task with a start time and duration. Use when the user wants something on the calendar.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "What the block is for"},
                    "start": {"type": "string", "description": "RFC 3339 start time"},
                    "duration_minutes": {"type": "integer", "description": "Length of the block (default 60)"},
                    "project": {"type": "string", "description": "Project this belongs to"}
                },
                "required": ["title", "start"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "title")?;
        let start = require_str(params, "start")?;
        DateTime::parse_from_rfc3339(start)
            .map_err(|e| Error::Tool(format!("Invalid start '{}': {}", start, e)))?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let title = require_str(&params, "title")?;
        let start = require_str(&params, "start")?;
        let start = DateTime::parse_from_rfc3339(start)
            .map_err(|e| Error::Tool(format!("Invalid start '{}': {}", start, e)))?
            .with_timezone(&Utc);

        let mut draft = AtomDraft::new("task", title);
        draft.scheduled_at = Some(start);
        draft.duration_minutes = Some(optional_u32(&params, "duration_minutes").unwrap_or(60));
        draft.project = optional_str(&params, "project").map(String::from);

        let atom = stores.atoms.create(draft).await?;
        Ok(json!({
            "success": true,
            "uuid": atom.id,
            "title": atom.title,
            "scheduled_at": atom.scheduled_at,
            "duration_minutes": atom.duration_minutes,
        }))
    }
}

/// Read back the schedule for a day.
pub struct GetScheduleTool;

#[async_trait]
impl Tool for GetScheduleTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_schedule",
            description: "List the scheduled blocks for a day, earliest first. Defaults to today.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "Day to read, YYYY-MM-DD (default today)"}
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if let Some(date) = optional_str(params, "date") {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| Error::Tool(format!("Invalid date '{}': {}", date, e)))?;
        }
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let date = match optional_str(&params, "date") {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| Error::Tool(format!("Invalid date '{}': {}", raw, e)))?,
            None => Utc::now().date_naive(),
        };

        let mut blocks: Vec<Value> = stores
            .atoms
            .list(None)
            .await?
            .into_iter()
            .filter(|atom| {
                atom.scheduled_at
                    .map(|at| at.date_naive() == date)
                    .unwrap_or(false)
            })
            .map(|atom| {
                json!({
                    "uuid": atom.id,
                    "title": atom.title,
                    "atom_type": atom.atom_type,
                    "scheduled_at": atom.scheduled_at,
                    "duration_minutes": atom.duration_minutes,
                    "completed": atom.completed,
                })
            })
            .collect();

        blocks.sort_by(|a, b| {
            a["scheduled_at"]
                .as_str()
                .unwrap_or("")
                .cmp(b["scheduled_at"].as_str().unwrap_or(""))
        });

        Ok(json!({
            "success": true,
            "date": date.to_string(),
            "count": blocks.len(),
            "blocks": blocks,
        }))
    }
}
