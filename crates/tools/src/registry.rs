use orbit_core::types::ToolSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::atoms::{BatchCreateTool, CreateAtomTool, DeleteAtomTool, GetAtomTool, ListAtomsTool, UpdateAtomTool};
use crate::focus::{ExtendDeepWorkTool, StartDeepWorkTool, StopDeepWorkTool};
use crate::prefs::{DeletePreferenceTool, GetPreferencesTool, SetPreferenceTool};
use crate::progress::{CompleteQuestTool, LogWorkoutTool, QueryProgressTool};
use crate::schedule::{GetScheduleTool, ScheduleBlockTool};
use crate::search::SearchAtomsTool;
use crate::Tool;

/// Registered-handler map: tool name → handler. Routing is open for
/// extension via `register`, not a central branch.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Creation
        registry.register(Arc::new(CreateAtomTool));
        registry.register(Arc::new(BatchCreateTool));

        // Editing
        registry.register(Arc::new(UpdateAtomTool));
        registry.register(Arc::new(DeleteAtomTool));

        // Scheduling
        registry.register(Arc::new(ScheduleBlockTool));
        registry.register(Arc::new(GetScheduleTool));

        // Focus sessions
        registry.register(Arc::new(StartDeepWorkTool));
        registry.register(Arc::new(StopDeepWorkTool));
        registry.register(Arc::new(ExtendDeepWorkTool));

        // Retrieval
        registry.register(Arc::new(SearchAtomsTool));
        registry.register(Arc::new(GetAtomTool));
        registry.register(Arc::new(ListAtomsTool));

        // Analytics
        registry.register(Arc::new(QueryProgressTool));
        registry.register(Arc::new(CompleteQuestTool));
        registry.register(Arc::new(LogWorkoutTool));

        // Preferences
        registry.register(Arc::new(GetPreferencesTool));
        registry.register(Arc::new(SetPreferenceTool));
        registry.register(Arc::new(DeletePreferenceTool));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas for the named tools only, in the order given. Unknown names
    /// are skipped.
    pub fn filtered_schemas(&self, names: &[&str]) -> Vec<ToolSchema> {
        names
            .iter()
            .filter_map(|name| self.tools.get(*name).map(|tool| tool.schema()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("create_atom").is_none());
    }

    #[test]
    fn test_defaults_cover_the_whole_catalog() {
        let reg = ToolRegistry::with_defaults();
        let names = reg.tool_names();
        for name in catalog::all_tool_names() {
            assert!(names.contains(&name.to_string()), "missing tool: {}", name);
        }
        assert_eq!(names.len(), catalog::all_tool_names().len());
    }

    #[test]
    fn test_filtered_schemas_preserves_order_and_skips_unknown() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.filtered_schemas(&["search_atoms", "nonexistent", "create_atom"]);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "search_atoms");
        assert_eq!(schemas[1].name, "create_atom");
    }

    #[test]
    fn test_every_schema_has_object_parameters() {
        let reg = ToolRegistry::with_defaults();
        let names = reg.tool_names();
        let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        for schema in reg.filtered_schemas(&name_refs) {
            assert_eq!(schema.parameters["type"], "object", "tool: {}", schema.name);
            assert!(!schema.description.is_empty());
        }
    }
}
