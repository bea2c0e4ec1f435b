use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orbit_core::types::{AtomDraft, AtomPatch, ToolSchema};
use orbit_core::{Error, Result};
use serde_json::{json, Value};

use crate::{optional_str, optional_u32, require_str, Stores, Tool};

const ATOM_TYPES: &[&str] = &[
    "idea", "task", "project", "research", "note", "thinkspace", "journal_entry",
];

fn draft_from_params(params: &Value) -> Result<AtomDraft> {
    let atom_type = require_str(params, "atom_type")?;
    let title = require_str(params, "title")?;

    let mut draft = AtomDraft::new(atom_type, title);
    draft.body = optional_str(params, "body").map(String::from);
    draft.project = optional_str(params, "project").map(String::from);
    draft.phase = optional_str(params, "phase").map(String::from);
    draft.duration_minutes = optional_u32(params, "duration_minutes");
    if let Some(raw) = optional_str(params, "scheduled_at") {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| Error::Tool(format!("Invalid scheduled_at '{}': {}", raw, e)))?;
        draft.scheduled_at = Some(parsed.with_timezone(&Utc));
    }
    Ok(draft)
}

/// Create one atom (idea, task, note, ...). The creation workhorse.
pub struct CreateAtomTool;

#[async_trait]
impl Tool for CreateAtomTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "create_atom",
            description: "Create a single atom: an idea, task, project, research item, note, thinkspace, or journal entry. Use when the user wants to capture or save one thing.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "atom_type": {
                        "type": "string",
                        "enum": ATOM_TYPES,
                        "description": "Kind of atom to create"
                    },
                    "title": {"type": "string", "description": "Short title"},
                    "body": {"type": "string", "description": "Optional longer content"},
                    "project": {"type": "string", "description": "Project this belongs to"},
                    "phase": {"type": "string", "description": "Pipeline phase (e.g. inbox, active, incubating)"},
                    "scheduled_at": {"type": "string", "description": "RFC 3339 start time, for timed atoms"},
                    "duration_minutes": {"type": "integer", "description": "Planned duration"}
                },
                "required": ["atom_type", "title"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "atom_type")?;
        require_str(params, "title")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let draft = draft_from_params(&params)?;
        let atom = stores.atoms.create(draft).await?;
        Ok(json!({
            "success": true,
            "uuid": atom.id,
            "atom_type": atom.atom_type,
            "title": atom.title,
        }))
    }
}

/// Brain-dump path: several atoms in one call.
pub struct BatchCreateTool;

#[async_trait]
impl Tool for BatchCreateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "batch_create",
            description: "Create several atoms at once. Use for brain dumps where the user lists multiple ideas or tasks in one message.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "atom_type": {"type": "string", "enum": ATOM_TYPES},
                                "title": {"type": "string"},
                                "body": {"type": "string"},
                                "project": {"type": "string"}
                            },
                            "required": ["atom_type", "title"]
                        },
                        "description": "Atoms to create, in order"
                    }
                },
                "required": ["items"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let items = params
            .get("items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Tool("Missing required parameter: items".to_string()))?;
        if items.is_empty() {
            return Err(Error::Tool("items must not be empty".to_string()));
        }
        for item in items {
            require_str(item, "atom_type")?;
            require_str(item, "title")?;
        }
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let items = params
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut uuids = Vec::new();
        for item in &items {
            let draft = draft_from_params(item)?;
            let atom = stores.atoms.create(draft).await?;
            uuids.push(atom.id);
        }

        Ok(json!({
            "success": true,
            "created": uuids.len(),
            "uuids": uuids,
        }))
    }
}

/// Partial update of an existing atom.
pub struct UpdateAtomTool;

#[async_trait]
impl Tool for UpdateAtomTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "update_atom",
            description: "Update fields of an existing atom by id: title, body, phase, project, schedule, duration, or completion state.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Atom id"},
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "project": {"type": "string"},
                    "phase": {"type": "string"},
                    "scheduled_at": {"type": "string", "description": "RFC 3339 start time"},
                    "duration_minutes": {"type": "integer"},
                    "completed": {"type": "boolean"}
                },
                "required": ["id"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "id")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let id = require_str(&params, "id")?;

        let mut patch = AtomPatch {
            title: optional_str(&params, "title").map(String::from),
            body: optional_str(&params, "body").map(String::from),
            project: optional_str(&params, "project").map(String::from),
            phase: optional_str(&params, "phase").map(String::from),
            duration_minutes: optional_u32(&params, "duration_minutes"),
            completed: params.get("completed").and_then(|v| v.as_bool()),
            ..Default::default()
        };
        if let Some(raw) = optional_str(&params, "scheduled_at") {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| Error::Tool(format!("Invalid scheduled_at '{}': {}", raw, e)))?;
            patch.scheduled_at = Some(parsed.with_timezone(&Utc));
        }

        match stores.atoms.update(id, patch).await? {
            Some(atom) => Ok(json!({
                "success": true,
                "uuid": atom.id,
                "title": atom.title,
            })),
            None => Err(Error::NotFound(format!("Atom not found: {}", id))),
        }
    }
}

/// Permanent removal; gated behind confirmation.
pub struct DeleteAtomTool;

#[async_trait]
impl Tool for DeleteAtomTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "delete_atom",
            description: "Permanently delete an atom by id. This cannot be undone; the user must approve it.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Atom id to delete"},
                    "confirmed": {"type": "boolean", "description": "Set by the confirmation flow; do not set yourself"}
                },
                "required": ["id"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "id")?;
        Ok(())
    }

    fn irreversible(&self) -> bool {
        true
    }

    fn confirm_description(&self, params: &Value) -> String {
        let id = optional_str(params, "id").unwrap_or("?");
        format!("Permanently delete atom {}", id)
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let id = require_str(&params, "id")?;
        if stores.atoms.delete(id).await? {
            Ok(json!({"success": true, "uuid": id, "deleted": true}))
        } else {
            Err(Error::NotFound(format!("Atom not found: {}", id)))
        }
    }
}

/// Fetch a single atom by id.
pub struct GetAtomTool;

#[async_trait]
impl Tool for GetAtomTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_atom",
            description: "Fetch one atom by id, including body and metadata.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Atom id"}
                },
                "required": ["id"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "id")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let id = require_str(&params, "id")?;
        match stores.atoms.get(id).await? {
            Some(atom) => Ok(json!({"success": true, "atom": atom})),
            None => Err(Error::NotFound(format!("Atom not found: {}", id))),
        }
    }
}

const LIST_CAP: usize = 50;

/// List atoms, optionally filtered by type.
pub struct ListAtomsTool;

#[async_trait]
impl Tool for ListAtomsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_atoms",
            description: "List stored atoms, optionally filtered by type. Returns the most recent first, capped at 50.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "atom_type": {
                        "type": "string",
                        "description": "Only atoms of this type (e.g. task, idea)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let atom_type = optional_str(&params, "atom_type");
        let mut atoms = stores.atoms.list(atom_type).await?;
        atoms.reverse(); // newest first
        atoms.truncate(LIST_CAP);
        Ok(json!({
            "success": true,
            "count": atoms.len(),
            "atoms": atoms,
        }))
    }
}
