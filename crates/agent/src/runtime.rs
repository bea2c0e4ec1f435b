use orbit_core::config::OrchestratorDefaults;
use orbit_core::types::{Conversation, Message};
use orbit_core::Result;
use orbit_providers::Provider;
use orbit_storage::ConversationStore;
use orbit_tools::{tools_for_intent, ToolDispatcher};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::ContextAssembler;
use crate::intent::IntentClassifier;

const APOLOGY: &str =
    "Sorry - I hit a problem reaching the model backend. Nothing was lost; please try again in a moment.";

const EXHAUSTED: &str =
    "I've reached the maximum number of tool steps for this request. Ask me to continue if you'd like me to keep going.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced text with no tool calls.
    Final,
    /// The iteration bound was hit without reaching a final response.
    Exhausted,
    /// A provider failure ended the turn early.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct TurnResult {
    pub text: String,
    pub outcome: TurnOutcome,
}

/// The turn state machine. One cooperative task per turn: the provider call
/// and every tool call are awaited sequentially, in the order the provider
/// returned them - a later call in the same batch may depend on state a
/// prior call just wrote.
pub struct Orchestrator {
    provider: Box<dyn Provider>,
    dispatcher: Arc<ToolDispatcher>,
    assembler: ContextAssembler,
    conversations: ConversationStore,
    classifier: IntentClassifier,
    max_tool_iterations: u32,
}

impl Orchestrator {
    pub fn new(
        provider: Box<dyn Provider>,
        dispatcher: Arc<ToolDispatcher>,
        assembler: ContextAssembler,
        conversations: ConversationStore,
        defaults: &OrchestratorDefaults,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            assembler,
            conversations,
            classifier: IntentClassifier::new(),
            max_tool_iterations: defaults.max_tool_iterations,
        }
    }

    /// Process one user turn. The conversation id comes from the originating
    /// channel; an unknown id starts a new conversation, a known one resumes
    /// it. The full conversation - tool calls and results included - is
    /// persisted on every exit path.
    pub async fn process_turn(
        &self,
        conversation_id: &str,
        channel: &str,
        user_text: &str,
    ) -> Result<TurnResult> {
        let mut conversation = self
            .conversations
            .load(conversation_id)?
            .unwrap_or_else(|| Conversation::new(conversation_id, channel));

        let intent = self.classifier.classify(user_text);
        let tool_names = tools_for_intent(intent);
        let tools = self.dispatcher.registry().filtered_schemas(&tool_names);
        info!(
            conversation_id = %conversation_id,
            intent = ?intent,
            tool_count = tools.len(),
            "Processing turn"
        );

        let system_prompt = self.assembler.assemble(&conversation, &tools).await;
        conversation.push(Message::user(user_text));

        for iteration in 0..self.max_tool_iterations {
            debug!(iteration, "Provider call");

            let wire = Self::wire_messages(&system_prompt, &conversation);
            let response = match self.provider.complete(&wire, &tools, None).await {
                Ok(response) => response,
                Err(e) => {
                    // Abort the turn; messages appended before the failure
                    // stay part of the persisted conversation.
                    warn!(error = %e, iteration, "Provider failed, aborting turn");
                    conversation.push(Message::assistant(APOLOGY));
                    self.conversations.save(&conversation)?;
                    return Ok(TurnResult {
                        text: APOLOGY.to_string(),
                        outcome: TurnOutcome::Aborted,
                    });
                }
            };

            debug!(
                input_tokens = ?response.input_tokens,
                output_tokens = ?response.output_tokens,
                tool_calls_count = response.tool_calls.len(),
                "Provider response"
            );

            if response.tool_calls.is_empty() {
                let text = response.content.unwrap_or_default();
                conversation.push(Message::assistant(&text));
                self.conversations.save(&conversation)?;
                return Ok(TurnResult {
                    text,
                    outcome: TurnOutcome::Final,
                });
            }

            conversation.push(Message::assistant_with_calls(
                response.content.as_deref().unwrap_or(""),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let result = self.dispatcher.dispatch(&call.name, call.arguments.clone()).await;
                Self::record_linked_atom(&mut conversation, &result);
                conversation.push(Message::tool_result(&call.id, &result.to_string()));
            }
        }

        warn!(
            conversation_id = %conversation_id,
            bound = self.max_tool_iterations,
            "Iteration bound reached, ending turn exhausted"
        );
        conversation.push(Message::assistant(EXHAUSTED));
        self.conversations.save(&conversation)?;
        Ok(TurnResult {
            text: EXHAUSTED.to_string(),
            outcome: TurnOutcome::Exhausted,
        })
    }

    /// Out-of-loop approval path: the surrounding application calls this when
    /// the user approves a pending confirmation (possibly from a different
    /// channel than the one that created it). Executes at most once; a
    /// missing or expired id comes back as an error payload, never a crash.
    pub async fn confirm_pending(
        &self,
        conversation_id: &str,
        confirmation_id: &str,
    ) -> Result<Value> {
        let result = self.dispatcher.confirm(confirmation_id).await;

        if let Some(mut conversation) = self.conversations.load(conversation_id)? {
            if Self::record_linked_atom(&mut conversation, &result) {
                self.conversations.save(&conversation)?;
            }
        }

        Ok(result)
    }

    /// System prompt plus the persisted transcript; the system message itself
    /// is never persisted.
    fn wire_messages(system_prompt: &str, conversation: &Conversation) -> Vec<Message> {
        let mut wire = Vec::with_capacity(conversation.messages().len() + 1);
        wire.push(Message::system(system_prompt));
        wire.extend(conversation.messages().iter().cloned());
        wire
    }

    /// Side-effect tracking: a `{"success": true, "uuid": X}` tool result
    /// links X to the conversation, deduplicated.
    fn record_linked_atom(conversation: &mut Conversation, result: &Value) -> bool {
        if result.get("success").and_then(|v| v.as_bool()) != Some(true) {
            return false;
        }
        match result.get("uuid").and_then(|v| v.as_str()) {
            Some(uuid) => conversation.link_atom(uuid),
            None => false,
        }
    }
}
