//! Static tool metadata: which tools exist, how they group by domain, and
//! which groups an intent exposes. Execution lives in the tool modules and
//! the dispatcher; this is declarative only.

/// Coarse classification of conversational goal, used to scope exposed tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Save something the user just said or linked
    Capture,
    /// Open-ended idea generation
    Brainstorm,
    /// Scheduling and time-blocking
    Plan,
    /// Question about stored state; scope unknown by construction
    Query,
    /// Acting on existing items: focus sessions, completions
    Execute,
    /// End-of-period review
    Debrief,
    /// Journaling and mood
    Reflect,
    /// Fixing or undoing something previously created
    Correct,
    /// Questions about the assistant itself or its settings
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolGroup {
    Creation,
    Editing,
    Scheduling,
    Focus,
    Retrieval,
    Analytics,
    Preferences,
}

const GROUPS: &[(ToolGroup, &[&str])] = &[
    (ToolGroup::Creation, &["create_atom", "batch_create"]),
    (ToolGroup::Editing, &["update_atom", "delete_atom"]),
    (ToolGroup::Scheduling, &["schedule_block", "get_schedule"]),
    (ToolGroup::Focus, &["start_deep_work", "stop_deep_work", "extend_deep_work"]),
    (ToolGroup::Retrieval, &["search_atoms", "get_atom", "list_atoms"]),
    (ToolGroup::Analytics, &["query_progress", "complete_quest", "log_workout"]),
    (ToolGroup::Preferences, &["get_preferences", "set_preference", "delete_preference"]),
];

pub fn tools_in_group(group: ToolGroup) -> &'static [&'static str] {
    GROUPS
        .iter()
        .find(|(g, _)| *g == group)
        .map(|(_, tools)| *tools)
        .unwrap_or(&[])
}

pub fn all_tool_names() -> Vec<&'static str> {
    let mut names: Vec<&str> = GROUPS.iter().flat_map(|(_, tools)| tools.iter().copied()).collect();
    names.sort();
    names
}

fn groups_for_intent(intent: Intent) -> &'static [ToolGroup] {
    use ToolGroup::*;
    match intent {
        Intent::Capture => &[Creation, Retrieval],
        Intent::Brainstorm => &[Creation, Retrieval],
        Intent::Plan => &[Scheduling, Creation, Retrieval],
        Intent::Execute => &[Focus, Scheduling, Editing],
        Intent::Debrief => &[Analytics, Retrieval, Scheduling],
        Intent::Reflect => &[Creation, Analytics],
        Intent::Correct => &[Editing, Retrieval],
        Intent::Meta => &[Preferences, Analytics],
        // Scope unknown by construction: expose everything
        Intent::Query => &[
            Creation, Editing, Scheduling, Focus, Retrieval, Analytics, Preferences,
        ],
    }
}

/// Union of the intent's groups, sorted and deduplicated.
pub fn tools_for_intent(intent: Intent) -> Vec<&'static str> {
    let mut names: Vec<&str> = groups_for_intent(intent)
        .iter()
        .flat_map(|g| tools_in_group(*g).iter().copied())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_exposes_everything() {
        assert_eq!(tools_for_intent(Intent::Query), all_tool_names());
    }

    #[test]
    fn test_capture_scopes_to_creation_and_retrieval() {
        let tools = tools_for_intent(Intent::Capture);
        assert!(tools.contains(&"create_atom"));
        assert!(tools.contains(&"batch_create"));
        assert!(tools.contains(&"search_atoms"));
        assert!(!tools.contains(&"delete_atom"));
        assert!(!tools.contains(&"set_preference"));
    }

    #[test]
    fn test_correct_exposes_editing() {
        let tools = tools_for_intent(Intent::Correct);
        assert!(tools.contains(&"delete_atom"));
        assert!(tools.contains(&"update_atom"));
        assert!(tools.contains(&"get_atom"));
        assert!(!tools.contains(&"start_deep_work"));
    }

    #[test]
    fn test_results_sorted_and_unique() {
        let tools = tools_for_intent(Intent::Plan);
        let mut sorted = tools.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tools, sorted);
    }

    #[test]
    fn test_every_group_resolves() {
        for (group, tools) in GROUPS {
            assert!(!tools.is_empty());
            assert_eq!(tools_in_group(*group), *tools);
        }
    }
}
