use orbit_core::types::{Conversation, Message};
use orbit_core::{Paths, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use tracing::debug;

/// One line of a persisted conversation file: metadata first, then one
/// message per line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_type")]
enum ConversationLine {
    #[serde(rename = "metadata")]
    Metadata {
        id: String,
        channel: String,
        updated_at: String,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        linked_atoms: Vec<String>,
    },
    #[serde(untagged)]
    Message(Message),
}

/// Conversation persistence: one jsonl file per conversation id, so external
/// channels resume the same thread across turns. Tool-call and tool-result
/// messages are persisted alongside visible text.
pub struct ConversationStore {
    paths: Paths,
}

impl ConversationStore {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Load a conversation by id; None when it has never been saved.
    pub fn load(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let path = self.paths.conversation_file(conversation_id);

        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut channel = String::new();
        let mut summary = None;
        let mut linked_atoms = Vec::new();
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ConversationLine>(&line) {
                Ok(ConversationLine::Metadata {
                    channel: ch,
                    summary: s,
                    linked_atoms: la,
                    ..
                }) => {
                    channel = ch;
                    summary = s;
                    linked_atoms = la;
                }
                Ok(ConversationLine::Message(msg)) => {
                    messages.push(msg);
                }
                Err(e) => {
                    debug!(error = %e, "Failed to parse conversation line, skipping");
                }
            }
        }

        Ok(Some(Conversation::from_parts(
            conversation_id.to_string(),
            channel,
            summary,
            linked_atoms,
            messages,
        )))
    }

    /// Persist the full conversation, metadata line first.
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let path = self.paths.conversation_file(&conversation.id);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&path)?;

        let metadata = ConversationLine::Metadata {
            id: conversation.id.clone(),
            channel: conversation.channel.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            summary: conversation.summary.clone(),
            linked_atoms: conversation.linked_atoms().to_vec(),
        };
        writeln!(file, "{}", serde_json::to_string(&metadata)?)?;

        for msg in conversation.messages() {
            writeln!(file, "{}", serde_json::to_string(msg)?)?;
        }

        Ok(())
    }
}
