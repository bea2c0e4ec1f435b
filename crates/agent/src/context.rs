use chrono::Utc;
use orbit_core::types::{Atom, Conversation, ToolSchema};
use orbit_tools::Stores;
use std::collections::BTreeMap;
use tracing::debug;

const PERSONA: &str = "\
You are Orbit, a personal momentum assistant. You help the user capture ideas, \
plan their day, run focus sessions, and keep their pipeline moving. Be concise \
and concrete. Prefer acting through tools over describing what you would do. \
Never invent atom ids; look things up first.";

const TOOL_GUIDANCE: &str = "\
Call a tool whenever the user's request maps to one. Search before creating \
likely duplicates. Irreversible actions (deleting, completing quests) come \
back with a confirmation request; tell the user approval is needed and stop. \
After tool results arrive, summarize the outcome in one or two sentences.";

/// Composes the system prompt from a fixed persona block plus a live
/// read-only snapshot of collaborator state. `assemble` is the single entry
/// point the orchestrator depends on; everything below is layout.
pub struct ContextAssembler {
    stores: Stores,
    recent_captures: usize,
}

impl ContextAssembler {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            recent_captures: 5,
        }
    }

    pub fn with_recent_captures(mut self, n: usize) -> Self {
        self.recent_captures = n;
        self
    }

    /// Build the prompt from live state. Store failures degrade to omitted
    /// sections rather than failing the turn.
    pub async fn assemble(&self, conversation: &Conversation, tools: &[ToolSchema]) -> String {
        let atoms = self.stores.atoms.list(None).await.unwrap_or_else(|e| {
            debug!(error = %e, "Atom snapshot unavailable, omitting state sections");
            Vec::new()
        });
        let preferences = self.stores.prefs.all().await.unwrap_or_else(|e| {
            debug!(error = %e, "Preferences unavailable, omitting section");
            Vec::new()
        });
        self.compose(conversation, &atoms, &preferences, tools)
    }

    fn compose(
        &self,
        conversation: &Conversation,
        atoms: &[Atom],
        preferences: &[(String, String)],
        tools: &[ToolSchema],
    ) -> String {
        let mut prompt = String::from(PERSONA);

        let today = Utc::now().date_naive();
        prompt.push_str(&format!("\n\nToday is {}.", today));

        // Today's schedule
        let mut scheduled: Vec<&Atom> = atoms
            .iter()
            .filter(|a| a.scheduled_at.map(|at| at.date_naive() == today).unwrap_or(false))
            .collect();
        scheduled.sort_by_key(|a| a.scheduled_at);
        if !scheduled.is_empty() {
            prompt.push_str("\n\n## Today's schedule\n");
            for atom in &scheduled {
                let time = atom
                    .scheduled_at
                    .map(|at| at.format("%H:%M").to_string())
                    .unwrap_or_default();
                let duration = atom
                    .duration_minutes
                    .map(|d| format!(" ({}min)", d))
                    .unwrap_or_default();
                let done = if atom.completed { " [done]" } else { "" };
                prompt.push_str(&format!("- {} {}{}{}\n", time, atom.title, duration, done));
            }
        }

        // Active-item counts by type
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for atom in atoms.iter().filter(|a| !a.completed) {
            *counts.entry(atom.atom_type.as_str()).or_default() += 1;
        }
        if !counts.is_empty() {
            prompt.push_str("\n## Active items\n");
            for (atom_type, count) in &counts {
                prompt.push_str(&format!("- {}: {}\n", atom_type, count));
            }
        }

        // Recent captures (ideas and notes, newest first)
        let captures: Vec<&Atom> = atoms
            .iter()
            .rev()
            .filter(|a| a.atom_type == "idea" || a.atom_type == "note")
            .take(self.recent_captures)
            .collect();
        if !captures.is_empty() {
            prompt.push_str("\n## Recent captures\n");
            for atom in &captures {
                prompt.push_str(&format!("- [{}] {}\n", atom.atom_type, atom.title));
            }
        }

        // Pipeline-phase tallies
        let mut phases: BTreeMap<&str, usize> = BTreeMap::new();
        for atom in atoms {
            if let Some(phase) = atom.phase.as_deref() {
                *phases.entry(phase).or_default() += 1;
            }
        }
        if !phases.is_empty() {
            prompt.push_str("\n## Pipeline\n");
            for (phase, count) in &phases {
                prompt.push_str(&format!("- {}: {}\n", phase, count));
            }
        }

        // Preference list
        if !preferences.is_empty() {
            prompt.push_str("\n## Preferences\n");
            for (key, value) in preferences {
                prompt.push_str(&format!("- {}: {}\n", key, value));
            }
        }

        // Prior-conversation summary
        if let Some(summary) = conversation.summary.as_deref() {
            prompt.push_str("\n## Earlier in this conversation\n");
            prompt.push_str(summary);
            prompt.push('\n');
        }

        // Tool-usage guidance
        if !tools.is_empty() {
            prompt.push_str("\n## Tools\n");
            prompt.push_str(TOOL_GUIDANCE);
            prompt.push('\n');
            for tool in tools {
                prompt.push_str(&format!("- {}\n", tool.name));
            }
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::types::AtomDraft;
    use orbit_storage::{AtomQuestEngine, KeywordSearch, MemoryAtomStore, MemoryPreferenceStore};
    use std::sync::Arc;

    fn stores() -> Stores {
        let atoms: Arc<MemoryAtomStore> = Arc::new(MemoryAtomStore::new());
        Stores {
            atoms: atoms.clone(),
            prefs: Arc::new(MemoryPreferenceStore::new()),
            search: Arc::new(KeywordSearch::new(atoms.clone())),
            quests: Arc::new(AtomQuestEngine::new(atoms)),
        }
    }

    fn tool(name: &'static str) -> ToolSchema {
        ToolSchema {
            name,
            description: "d",
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    #[tokio::test]
    async fn test_empty_state_yields_persona_and_tools_only() {
        let assembler = ContextAssembler::new(stores());
        let conversation = Conversation::new("c1", "app");
        let prompt = assembler.assemble(&conversation, &[tool("create_atom")]).await;

        assert!(prompt.contains("You are Orbit"));
        assert!(prompt.contains("## Tools"));
        assert!(prompt.contains("- create_atom"));
        assert!(!prompt.contains("## Today's schedule"));
        assert!(!prompt.contains("## Preferences"));
    }

    #[tokio::test]
    async fn test_live_sections_appear_when_populated() {
        let s = stores();

        let mut draft = AtomDraft::new("task", "Write launch post");
        draft.scheduled_at = Some(Utc::now());
        draft.duration_minutes = Some(45);
        s.atoms.create(draft).await.unwrap();

        let mut draft = AtomDraft::new("idea", "Partner newsletter swap");
        draft.phase = Some("inbox".to_string());
        s.atoms.create(draft).await.unwrap();

        s.prefs.set("assistant.tone", "direct").await.unwrap();

        let assembler = ContextAssembler::new(s);
        let mut conversation = Conversation::new("c1", "app");
        conversation.summary = Some("Planning the beta launch.".to_string());

        let prompt = assembler.assemble(&conversation, &[tool("search_atoms")]).await;

        assert!(prompt.contains("## Today's schedule"));
        assert!(prompt.contains("Write launch post"));
        assert!(prompt.contains("(45min)"));
        assert!(prompt.contains("## Active items"));
        assert!(prompt.contains("- idea: 1"));
        assert!(prompt.contains("## Recent captures"));
        assert!(prompt.contains("[idea] Partner newsletter swap"));
        assert!(prompt.contains("## Pipeline\n- inbox: 1"));
        assert!(prompt.contains("- assistant.tone: direct"));
        assert!(prompt.contains("## Earlier in this conversation"));
        assert!(prompt.contains("Planning the beta launch."));
    }

    #[tokio::test]
    async fn test_recent_captures_cap() {
        let s = stores();
        for i in 0..8 {
            s.atoms
                .create(AtomDraft::new("idea", &format!("idea {}", i)))
                .await
                .unwrap();
        }

        let assembler = ContextAssembler::new(s).with_recent_captures(3);
        let prompt = assembler
            .assemble(&Conversation::new("c1", "app"), &[])
            .await;

        // Newest three only
        assert!(prompt.contains("idea 7"));
        assert!(prompt.contains("idea 5"));
        assert!(!prompt.contains("idea 4"));
    }
}
