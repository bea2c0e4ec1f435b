use async_trait::async_trait;
use orbit_core::types::{Atom, AtomDraft, AtomPatch};
use orbit_core::Result;
use serde::Serialize;
use serde_json::Value;

/// Entity store for atoms: create/fetch/update/delete by id, fetch-all by
/// type. Backed by whatever persistence the surrounding application wires in.
#[async_trait]
pub trait AtomStore: Send + Sync {
    async fn create(&self, draft: AtomDraft) -> Result<Atom>;
    async fn get(&self, id: &str) -> Result<Option<Atom>>;
    async fn update(&self, id: &str, patch: AtomPatch) -> Result<Option<Atom>>;
    async fn delete(&self, id: &str) -> Result<bool>;
    /// All atoms, optionally filtered by type, oldest first.
    async fn list(&self, atom_type: Option<&str>) -> Result<Vec<Atom>>;
}

/// Preference store keyed by scoped strings (e.g. "assistant.tone").
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn all(&self) -> Result<Vec<(String, String)>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
}

/// Keyword/semantic query over the atom corpus, ranked.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: &str, atom_type: Option<&str>, limit: usize)
        -> Result<Vec<SearchHit>>;
}

/// Quest/progress engine: evaluates progress queries and completes quests
/// manually. Result payloads are opaque flat JSON for the model to read.
#[async_trait]
pub trait QuestEngine: Send + Sync {
    async fn evaluate(&self, query_type: &str, dimension: Option<&str>) -> Result<Value>;
    async fn manual_complete(&self, quest_id: &str) -> Result<Value>;
}
