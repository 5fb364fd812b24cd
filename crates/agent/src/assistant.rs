//! One assistant invocation: prompt the model, parse its JSON command and
//! append the resulting message, re-prompting with a correction when the
//! reply is unusable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use aerodesk_core::domain::conversation::{ConversationState, Message, Role, ToolCall};
use aerodesk_core::domain::tool::ToolId;
use aerodesk_core::errors::ApplicationError;
use aerodesk_core::flows::{AssistantId, DialogGraph};

use crate::llm::{to_chat_messages, LlmClient};
use crate::parser::parse_response;
use crate::prompts::PromptRenderer;

pub const APOLOGY: &str = "Sorry, I do not have an answer for that.";
pub const INVALID_JSON_CORRECTION: &str = "Respond with a valid json output!";
pub const EMPTY_RESULT_CORRECTION: &str = "Checked parameters of called tool again and return a Json Blob \
     with correct and alternative parameters in \"ACTION_PARAMS\"";

pub fn unknown_action_correction(action: &str) -> String {
    format!("The ACTION `{action}` does not exist!")
}

pub struct Assistant {
    llm: Arc<dyn LlmClient>,
    prompts: PromptRenderer,
    graph: DialogGraph,
    max_attempts: u32,
}

impl Assistant {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: PromptRenderer,
        graph: DialogGraph,
        max_attempts: u32,
    ) -> Self {
        Self { llm, prompts, graph, max_attempts: max_attempts.max(1) }
    }

    pub fn graph(&self) -> &DialogGraph {
        &self.graph
    }

    /// Appends exactly one assistant message to `state`: a tool call or a
    /// final answer. Corrective exchanges from failed attempts stay in the
    /// history.
    pub async fn invoke(
        &self,
        owner: AssistantId,
        state: &mut ConversationState,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        if let Some(last) = state.messages.last_mut() {
            if last.role == Role::Tool && last.content.trim().is_empty() {
                last.content = EMPTY_RESULT_CORRECTION.to_string();
            }
        }

        let toolset = self.graph.toolset(owner);

        for attempt in 1..=self.max_attempts {
            let system_prompt = self
                .prompts
                .render(self.graph.layout(), owner, &toolset, state.user_info.as_deref(), now)
                .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
            let transcript = to_chat_messages(&system_prompt, &state.messages);

            let raw = self
                .llm
                .complete(&transcript)
                .await
                .map_err(|error| ApplicationError::Integration(format!("{error:#}")))?;

            if raw.trim().is_empty() {
                warn!(
                    event_name = "assistant.empty_output",
                    owner = owner.as_str(),
                    attempt,
                    "model returned empty output"
                );
                state.push(Message::assistant(APOLOGY));
                return Ok(());
            }

            let parsed = match parse_response(&raw) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(
                        event_name = "assistant.invalid_json",
                        owner = owner.as_str(),
                        attempt,
                        error = %error,
                        "model output is not a valid command"
                    );
                    state.push(Message::assistant(raw));
                    state.push(Message::user(INVALID_JSON_CORRECTION));
                    continue;
                }
            };

            // Every named action must exist, even when a final answer is present.
            let tool = match parsed.action.as_deref() {
                None => None,
                Some(action) => {
                    let known = ToolId::from_name(action).filter(|tool| toolset.contains(*tool));
                    if known.is_none() {
                        warn!(
                            event_name = "assistant.unknown_action",
                            owner = owner.as_str(),
                            attempt,
                            action,
                            "model requested a tool outside its toolset"
                        );
                        let correction = unknown_action_correction(action);
                        state.push(Message::assistant(raw));
                        state.push(Message::user(correction));
                        continue;
                    }
                    known
                }
            };

            if let (Some(tool), None) = (tool, parsed.final_answer.as_ref()) {
                debug!(
                    event_name = "assistant.tool_requested",
                    owner = owner.as_str(),
                    attempt,
                    tool = tool.name(),
                    "model requested a tool"
                );
                state.push(Message::assistant_with_call(raw, ToolCall::new(tool, parsed.params)));
                return Ok(());
            }

            let answer = parsed.final_answer.unwrap_or_else(|| APOLOGY.to_string());
            state.push(Message::assistant(answer));
            return Ok(());
        }

        warn!(
            event_name = "assistant.retries_exhausted",
            owner = owner.as_str(),
            attempts = self.max_attempts,
            "giving up on model output"
        );
        Err(ApplicationError::RetriesExhausted { attempts: self.max_attempts })
    }
}
