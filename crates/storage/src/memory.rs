//! In-memory reference implementations of the collaborator stores. Embedding
//! applications wire in their own persistence; these back the test suites and
//! small deployments.

use async_trait::async_trait;
use chrono::Utc;
use orbit_core::types::{Atom, AtomDraft, AtomPatch};
use orbit_core::{Error, Result};
use orbit_tools::stores::{AtomStore, PreferenceStore, QuestEngine, SearchEngine, SearchHit};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Atoms held in a vec in creation order.
#[derive(Default)]
pub struct MemoryAtomStore {
    atoms: RwLock<Vec<Atom>>,
}

impl MemoryAtomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AtomStore for MemoryAtomStore {
    async fn create(&self, draft: AtomDraft) -> Result<Atom> {
        let atom = Atom {
            id: Uuid::new_v4().to_string(),
            atom_type: draft.atom_type,
            title: draft.title,
            body: draft.body,
            project: draft.project,
            phase: draft.phase,
            scheduled_at: draft.scheduled_at,
            duration_minutes: draft.duration_minutes,
            completed: false,
            created_at: Utc::now(),
            metadata: draft.metadata,
        };
        self.atoms.write().unwrap().push(atom.clone());
        Ok(atom)
    }

    async fn get(&self, id: &str) -> Result<Option<Atom>> {
        Ok(self.atoms.read().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn update(&self, id: &str, patch: AtomPatch) -> Result<Option<Atom>> {
        let mut atoms = self.atoms.write().unwrap();
        let Some(atom) = atoms.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            atom.title = title;
        }
        if let Some(body) = patch.body {
            atom.body = Some(body);
        }
        if let Some(project) = patch.project {
            atom.project = Some(project);
        }
        if let Some(phase) = patch.phase {
            atom.phase = Some(phase);
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            atom.scheduled_at = Some(scheduled_at);
        }
        if let Some(duration) = patch.duration_minutes {
            atom.duration_minutes = Some(duration);
        }
        if let Some(completed) = patch.completed {
            atom.completed = completed;
        }

        Ok(Some(atom.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut atoms = self.atoms.write().unwrap();
        let before = atoms.len();
        atoms.retain(|a| a.id != id);
        Ok(atoms.len() < before)
    }

    async fn list(&self, atom_type: Option<&str>) -> Result<Vec<Atom>> {
        Ok(self
            .atoms
            .read()
            .unwrap()
            .iter()
            .filter(|a| atom_type.map(|t| a.atom_type == t).unwrap_or(true))
            .cloned()
            .collect())
    }
}

/// Preferences in a sorted map so `all()` is stable.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    prefs: RwLock<BTreeMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.prefs.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.prefs
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.prefs.write().unwrap().remove(key).is_some())
    }

    async fn all(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .prefs
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Term-frequency keyword search over an atom store. Scores one point per
/// term occurrence in the title, half a point in the body.
pub struct KeywordSearch {
    atoms: Arc<dyn AtomStore>,
}

impl KeywordSearch {
    pub fn new(atoms: Arc<dyn AtomStore>) -> Self {
        Self { atoms }
    }

    fn score(atom: &Atom, terms: &[String]) -> f32 {
        let title = atom.title.to_lowercase();
        let body = atom.body.as_deref().unwrap_or("").to_lowercase();
        let mut score = 0.0;
        for term in terms {
            score += title.matches(term.as_str()).count() as f32;
            score += body.matches(term.as_str()).count() as f32 * 0.5;
        }
        score
    }

    fn snippet(atom: &Atom) -> String {
        let source = atom.body.as_deref().unwrap_or(&atom.title);
        let mut snippet: String = source.chars().take(120).collect();
        if source.chars().count() > 120 {
            snippet.push_str("...");
        }
        snippet
    }
}

#[async_trait]
impl SearchEngine for KeywordSearch {
    async fn search(
        &self,
        query: &str,
        atom_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        let mut hits: Vec<SearchHit> = self
            .atoms
            .list(atom_type)
            .await?
            .iter()
            .filter_map(|atom| {
                let score = Self::score(atom, &terms);
                if score > 0.0 {
                    Some(SearchHit {
                        id: atom.id.clone(),
                        title: atom.title.clone(),
                        snippet: Self::snippet(atom),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

const LEVEL_STEP: usize = 10;

/// Quest/progress engine over the same atom store: quests are atoms of type
/// "quest"; level derives from completed atoms.
pub struct AtomQuestEngine {
    atoms: Arc<dyn AtomStore>,
}

impl AtomQuestEngine {
    pub fn new(atoms: Arc<dyn AtomStore>) -> Self {
        Self { atoms }
    }

    fn quest_json(atom: &Atom) -> Value {
        json!({
            "quest_id": atom.id,
            "title": atom.title,
            "completed": atom.completed,
            "dimension": atom.metadata.get("dimension"),
        })
    }
}

#[async_trait]
impl QuestEngine for AtomQuestEngine {
    async fn evaluate(&self, query_type: &str, dimension: Option<&str>) -> Result<Value> {
        let all = self.atoms.list(None).await?;
        let completed = all.iter().filter(|a| a.completed).count();

        match query_type {
            "overview" => Ok(json!({
                "total_atoms": all.len(),
                "completed": completed,
                "open": all.len() - completed,
            })),
            "level" => Ok(json!({
                "level": 1 + completed / LEVEL_STEP,
                "progress": completed % LEVEL_STEP,
                "next_level_at": LEVEL_STEP,
            })),
            "streak" => {
                let sessions = all
                    .iter()
                    .filter(|a| a.atom_type == "focus_session" && a.completed)
                    .count();
                Ok(json!({"focus_sessions_completed": sessions}))
            }
            "quests" | "dimension_status" => {
                let quests: Vec<Value> = all
                    .iter()
                    .filter(|a| a.atom_type == "quest")
                    .filter(|a| {
                        dimension
                            .map(|d| a.metadata.get("dimension").and_then(|v| v.as_str()) == Some(d))
                            .unwrap_or(true)
                    })
                    .map(Self::quest_json)
                    .collect();
                Ok(json!({
                    "count": quests.len(),
                    "quests": quests,
                    "dimension": dimension,
                }))
            }
            other => Err(Error::Tool(format!("Unknown progress query type: {}", other))),
        }
    }

    async fn manual_complete(&self, quest_id: &str) -> Result<Value> {
        let patch = AtomPatch {
            completed: Some(true),
            ..Default::default()
        };
        match self.atoms.update(quest_id, patch).await? {
            Some(atom) => Ok(json!({
                "quest_id": atom.id,
                "title": atom.title,
                "completed": true,
            })),
            None => Err(Error::NotFound(format!("Quest not found: {}", quest_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_atom_store_crud() {
        let store = MemoryAtomStore::new();

        let atom = store
            .create(AtomDraft::new("idea", "launch campaign"))
            .await
            .unwrap();
        assert!(!atom.completed);

        let fetched = store.get(&atom.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "launch campaign");

        let patch = AtomPatch {
            completed: Some(true),
            title: Some("launch the campaign".to_string()),
            ..Default::default()
        };
        let updated = store.update(&atom.id, patch).await.unwrap().unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "launch the campaign");

        assert!(store.delete(&atom.id).await.unwrap());
        assert!(!store.delete(&atom.id).await.unwrap());
        assert!(store.get(&atom.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_atom_store_list_filters_by_type() {
        let store = MemoryAtomStore::new();
        store.create(AtomDraft::new("idea", "one")).await.unwrap();
        store.create(AtomDraft::new("task", "two")).await.unwrap();
        store.create(AtomDraft::new("idea", "three")).await.unwrap();

        assert_eq!(store.list(Some("idea")).await.unwrap().len(), 2);
        assert_eq!(store.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_keyword_search_ranks_title_over_body() {
        let atoms: Arc<dyn AtomStore> = Arc::new(MemoryAtomStore::new());
        let mut draft = AtomDraft::new("idea", "campaign budget");
        draft.body = Some("notes".to_string());
        atoms.create(draft).await.unwrap();

        let mut draft = AtomDraft::new("idea", "misc");
        draft.body = Some("campaign".to_string());
        atoms.create(draft).await.unwrap();

        let search = KeywordSearch::new(atoms);
        let hits = search.search("campaign", None, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "campaign budget");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_keyword_search_no_match_is_empty() {
        let atoms: Arc<dyn AtomStore> = Arc::new(MemoryAtomStore::new());
        atoms.create(AtomDraft::new("idea", "one")).await.unwrap();

        let search = KeywordSearch::new(atoms);
        assert!(search.search("zeppelin", None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quest_engine_level_and_overview() {
        let atoms: Arc<dyn AtomStore> = Arc::new(MemoryAtomStore::new());
        for i in 0..12 {
            let atom = atoms.create(AtomDraft::new("task", &format!("t{}", i))).await.unwrap();
            let patch = AtomPatch { completed: Some(true), ..Default::default() };
            atoms.update(&atom.id, patch).await.unwrap();
        }
        atoms.create(AtomDraft::new("task", "open")).await.unwrap();

        let engine = AtomQuestEngine::new(atoms);
        let level = engine.evaluate("level", None).await.unwrap();
        assert_eq!(level["level"], 2);
        assert_eq!(level["progress"], 2);

        let overview = engine.evaluate("overview", None).await.unwrap();
        assert_eq!(overview["total_atoms"], 13);
        assert_eq!(overview["open"], 1);

        assert!(engine.evaluate("nonsense", None).await.is_err());
    }

    #[tokio::test]
    async fn test_quest_engine_manual_complete() {
        let atoms: Arc<dyn AtomStore> = Arc::new(MemoryAtomStore::new());
        let mut draft = AtomDraft::new("quest", "publish weekly review");
        draft.metadata = json!({"dimension": "craft"});
        let quest = atoms.create(draft).await.unwrap();

        let engine = AtomQuestEngine::new(atoms.clone());
        let result = engine.manual_complete(&quest.id).await.unwrap();
        assert_eq!(result["completed"], true);
        assert!(atoms.get(&quest.id).await.unwrap().unwrap().completed);

        assert!(engine.manual_complete("missing").await.is_err());

        let by_dim = engine.evaluate("dimension_status", Some("craft")).await.unwrap();
        assert_eq!(by_dim["count"], 1);
        let none = engine.evaluate("dimension_status", Some("health")).await.unwrap();
        assert_eq!(none["count"], 0);
    }
}
