use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// An irreversible tool call waiting for user approval. Arguments already
/// carry `confirmed: true` so the stored call replays straight through the
/// gate. Consumed at most once.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub id: String,
    pub tool: String,
    pub arguments: Value,
    pub description: String,
    pub created_at: Instant,
}

/// The single shared-mutable table in the system: a confirmation created on
/// one channel may be approved from another, so insert, consume, and the
/// expiry sweep all serialize on one mutex. Entries expire after 300s.
pub struct ConfirmationStore {
    entries: Mutex<HashMap<String, PendingConfirmation>>,
    ttl: Duration,
}

impl ConfirmationStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Store a pending call under a fresh id. Sweeps expired entries first.
    pub async fn insert(&self, tool: &str, arguments: Value, description: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().await;
        Self::sweep_locked(&mut entries, self.ttl);
        info!(confirmation_id = %id, tool = %tool, "Pending confirmation created");
        entries.insert(
            id.clone(),
            PendingConfirmation {
                id: id.clone(),
                tool: tool.to_string(),
                arguments,
                description: description.to_string(),
                created_at: Instant::now(),
            },
        );
        id
    }

    /// Remove and return an entry. A missing, already-consumed, or expired id
    /// yields None; removal under the lock is what makes consumption
    /// at-most-once across channels.
    pub async fn take(&self, id: &str) -> Option<PendingConfirmation> {
        let mut entries = self.entries.lock().await;
        Self::sweep_locked(&mut entries, self.ttl);
        entries.remove(id)
    }

    /// Purge expired entries; for a periodic sweep task. Returns the number
    /// removed.
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        Self::sweep_locked(&mut entries, self.ttl)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn sweep_locked(entries: &mut HashMap<String, PendingConfirmation>, ttl: Duration) -> usize {
        let before = entries.len();
        entries.retain(|id, entry| {
            let keep = entry.created_at.elapsed() < ttl;
            if !keep {
                debug!(confirmation_id = %id, tool = %entry.tool, "Pending confirmation expired");
            }
            keep
        });
        before - entries.len()
    }
}

impl Default for ConfirmationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_then_take_consumes_once() {
        let store = ConfirmationStore::new();
        let id = store
            .insert("delete_atom", json!({"id": "a1", "confirmed": true}), "Delete atom a1")
            .await;

        let entry = store.take(&id).await.expect("entry should exist");
        assert_eq!(entry.tool, "delete_atom");
        assert_eq!(entry.arguments["confirmed"], true);

        // Second take: already consumed
        assert!(store.take(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_yields_none() {
        let store = ConfirmationStore::new();
        assert!(store.take("no-such-id").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let store = ConfirmationStore::with_ttl(Duration::from_millis(30));
        let id = store.insert("delete_atom", json!({"id": "a1"}), "Delete").await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.take(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_expired_counts_purged_entries() {
        let store = ConfirmationStore::with_ttl(Duration::from_millis(30));
        store.insert("delete_atom", json!({"id": "a1"}), "one").await;
        store.insert("delete_atom", json!({"id": "a2"}), "two").await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.sweep_expired().await, 2);
        assert!(store.is_empty().await);
    }
}
