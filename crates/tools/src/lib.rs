pub mod atoms;
pub mod catalog;
pub mod confirm;
pub mod dispatcher;
pub mod focus;
pub mod prefs;
pub mod progress;
pub mod registry;
pub mod schedule;
pub mod search;
pub mod stores;

use async_trait::async_trait;
use orbit_core::types::ToolSchema;
use orbit_core::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

pub use catalog::{tools_for_intent, Intent, ToolGroup};
pub use confirm::{ConfirmationStore, PendingConfirmation};
pub use dispatcher::ToolDispatcher;
pub use registry::ToolRegistry;
pub use stores::{AtomStore, PreferenceStore, QuestEngine, SearchEngine, SearchHit};

/// Collaborator handles every tool executes against. The dispatcher owns the
/// only copy; the orchestrator never touches these directly.
#[derive(Clone)]
pub struct Stores {
    pub atoms: Arc<dyn AtomStore>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub search: Arc<dyn SearchEngine>,
    pub quests: Arc<dyn QuestEngine>,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    /// Irreversible tools require the two-phase confirmation gate.
    fn irreversible(&self) -> bool {
        false
    }
    /// Human-readable description shown on the approval surface.
    fn confirm_description(&self, _params: &Value) -> String {
        format!("Run {}", self.schema().name)
    }
    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value>;
}

pub(crate) fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Tool(format!("Missing required parameter: {}", key)))
}

pub(crate) fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub(crate) fn optional_u32(params: &Value, key: &str) -> Option<u32> {
    params.get(key).and_then(|v| v.as_u64()).map(|n| n as u32)
}
