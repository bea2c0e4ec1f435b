use async_trait::async_trait;
use orbit_core::types::ToolSchema;
use orbit_core::Result;
use serde_json::{json, Value};

use crate::{optional_str, require_str, Stores, Tool};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 25;

/// Ranked search over the atom corpus via the search collaborator.
pub struct SearchAtomsTool;

#[async_trait]
impl Tool for SearchAtomsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_atoms",
            description: "Search stored atoms by keywords. Returns ranked snippets. Use before creating duplicates or when the user asks about past items.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search terms"},
                    "atom_type": {"type": "string", "description": "Only atoms of this type"},
                    "limit": {"type": "integer", "description": "Max results (default 10)"}
                },
                "required": ["query"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        require_str(params, "query")?;
        Ok(())
    }

    async fn execute(&self, stores: &Stores, params: Value) -> Result<Value> {
        let query = require_str(&params, "query")?;
        let atom_type = optional_str(&params, "atom_type");
        let limit = params
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).min(MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);

        let hits = stores.search.search(query, atom_type, limit).await?;

        Ok(json!({
            "success": true,
            "count": hits.len(),
            "results": hits,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_atoms_validate() {
        let tool = SearchAtomsTool;
        assert!(tool.validate(&json!({"query": "campaign"})).is_ok());
        assert!(tool.validate(&json!({"query": ""})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }
}
