//! # Tool-Call Orchestrator
//!
//! Drives one chat exchange: the tool-selection model turn, sequential dispatch of any
//! requested tool calls through the executor, and the summary turn that turns tool
//! results into the final reply.
//!
//! The session lock is held for the whole exchange, so two requests on the same
//! session run one after the other. Messages produced during the exchange are staged
//! and only committed once the final reply exists; if either model call fails, the
//! session keeps the user message and nothing else from that turn.

use std::sync::Arc;

use crate::application::conversation::{ConversationStore, Session};
use crate::domain::config::{Sampling, SamplingConfig};
use crate::domain::traits::{ChatModel, ModelError};
use crate::domain::types::{ChatRequest, Message, ModelReply, ToolCallRequest};
use crate::infrastructure::tools::executor::SharedCommandExecutor;
use crate::infrastructure::tools::schema;
use crate::strings::messages;

/// Where a single exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingFirstModelTurn,
    DispatchingTools,
    AwaitingSecondModelTurn,
    Done,
}

pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    executor: SharedCommandExecutor,
    store: Arc<ConversationStore>,
    sampling: SamplingConfig,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        executor: SharedCommandExecutor,
        store: Arc<ConversationStore>,
        sampling: SamplingConfig,
    ) -> Self {
        Self {
            model,
            executor,
            store,
            sampling,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Handles one user message and returns the reply text. Model failures become
    /// a single error reply; they are never propagated.
    pub async fn handle_message(&self, session_id: &str, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return messages::EMPTY_MESSAGE_REPLY.to_string();
        }

        let session = self.store.get_or_create(session_id);
        let mut session = session.lock().await;
        self.store.append(&mut session, Message::user(text));

        match self.run_turn(&mut session).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session = %session_id, "Chat turn failed: {}", e);
                e.to_string()
            }
        }
    }

    async fn run_turn(&self, session: &mut Session) -> Result<String, ModelError> {
        let mut phase = TurnPhase::AwaitingFirstModelTurn;
        tracing::debug!(session = %session.id, ?phase, "Turn started");

        let first = self
            .model
            .complete(self.request(session, &[], true, self.sampling.tool_turn))
            .await?;

        let mut staged: Vec<Message> = Vec::new();

        let reply = if first.has_tool_calls() {
            phase = TurnPhase::DispatchingTools;
            tracing::debug!(session = %session.id, ?phase, calls = first.tool_calls.len());

            let ModelReply {
                content,
                tool_calls,
            } = first;
            staged.push(Message::assistant_tool_calls(content, tool_calls.clone()));
            for call in &tool_calls {
                staged.push(self.dispatch(call).await);
            }

            phase = TurnPhase::AwaitingSecondModelTurn;
            tracing::debug!(session = %session.id, ?phase);

            let second = self
                .model
                .complete(self.request(session, &staged, false, self.sampling.summary_turn))
                .await?;
            second.content.unwrap_or_default()
        } else {
            first.content.unwrap_or_default()
        };

        staged.push(Message::assistant(reply.clone()));
        session.extend(staged);
        let dropped = self.store.trim(session);

        phase = TurnPhase::Done;
        tracing::debug!(session = %session.id, ?phase, dropped, history = session.len());
        Ok(reply)
    }

    fn request(
        &self,
        session: &Session,
        staged: &[Message],
        with_tools: bool,
        sampling: Sampling,
    ) -> ChatRequest {
        let mut messages = session.request_messages();
        messages.extend_from_slice(staged);

        ChatRequest {
            messages,
            tools: if with_tools {
                vec![schema::definition()]
            } else {
                Vec::new()
            },
            temperature: Some(sampling.temperature),
            max_tokens: Some(sampling.max_tokens),
        }
    }

    /// Runs one tool call and renders its tool-result message. Argument problems
    /// are reported to the model rather than executed.
    async fn dispatch(&self, call: &ToolCallRequest) -> Message {
        let payload = match schema::parse_call(call) {
            Ok(args) => {
                let result = self.executor.execute(&args.command_parts).await;
                result.to_payload()
            }
            Err(e) => {
                tracing::warn!(call = %call.id, "Tool call rejected: {}", e);
                serde_json::json!({ "error": messages::tool_failed(&e.to_string()) })
            }
        };
        Message::tool_result(call, payload.to_string())
    }
}
