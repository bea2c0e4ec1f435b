use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ConfirmationStore, Stores, ToolRegistry};

/// Routes a tool call to its handler and owns the confirmation gate.
///
/// Nothing escapes this boundary as an error: unknown tools, invalid
/// arguments, and execution failures all come back as `{"error": ...}`
/// payloads so the orchestrator always has a tool-result message to feed
/// back into the loop.
pub struct ToolDispatcher {
    registry: ToolRegistry,
    stores: Stores,
    confirmations: ConfirmationStore,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, stores: Stores) -> Self {
        Self {
            registry,
            stores,
            confirmations: ConfirmationStore::new(),
        }
    }

    pub fn with_confirmation_ttl(registry: ToolRegistry, stores: Stores, ttl: Duration) -> Self {
        Self {
            registry,
            stores,
            confirmations: ConfirmationStore::with_ttl(ttl),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one tool call. Irreversible tools without `confirmed: true`
    /// do not run; they are parked in the confirmation table and the caller
    /// gets the confirmation payload instead.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Value {
        let tool = match self.registry.get(name) {
            Some(tool) => tool,
            None => {
                warn!(tool = name, "Unknown tool requested");
                return json!({"error": format!("Unknown tool: {}", name)});
            }
        };

        if let Err(e) = tool.validate(&arguments) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return json!({"error": e.to_string()});
        }

        let confirmed = arguments
            .get("confirmed")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if tool.irreversible() && !confirmed {
            let description = tool.confirm_description(&arguments);
            let mut stored_args = arguments;
            if let Some(obj) = stored_args.as_object_mut() {
                obj.insert("confirmed".to_string(), Value::Bool(true));
            }
            let confirmation_id = self.confirmations.insert(name, stored_args, &description).await;
            return json!({
                "confirmation_required": true,
                "confirmation_id": confirmation_id,
                "action": name,
                "description": description,
            });
        }

        debug!(tool = name, "Executing tool");
        match tool.execute(&self.stores, arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                json!({"error": e.to_string()})
            }
        }
    }

    /// Out-of-loop approval path, invoked by the surrounding application.
    /// Consumes the entry (at most once) and executes the now-confirmed call.
    pub async fn confirm(&self, confirmation_id: &str) -> Value {
        match self.confirmations.take(confirmation_id).await {
            Some(pending) => {
                debug!(confirmation_id, tool = %pending.tool, "Executing confirmed action");
                self.dispatch(&pending.tool, pending.arguments).await
            }
            None => json!({"error": "confirmation not found or expired"}),
        }
    }

    /// Purge expired confirmations; for a periodic sweep.
    pub async fn sweep_expired(&self) -> usize {
        self.confirmations.sweep_expired().await
    }

    pub async fn pending_confirmations(&self) -> usize {
        self.confirmations.len().await
    }
}
