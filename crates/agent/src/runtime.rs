//! Graph executor. A turn starts at `FetchUserInfo`, walks assistant and tool
//! nodes until an assistant answers without a tool call, and halts early when
//! a sensitive tool node needs the user's approval. Every exit persists the
//! session snapshot.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use aerodesk_core::config::AppConfig;
use aerodesk_core::domain::conversation::{ConversationState, Message, ToolCall};
use aerodesk_core::domain::session::{SessionConfig, SessionId, SessionSnapshot};
use aerodesk_core::errors::{ApplicationError, DomainError};
use aerodesk_core::flows::{AssistantId, DialogGraph, FlowTransitionError, Node, Skill};
use aerodesk_db::repositories::{
    CheckpointStore, SqlCarRentalRepository, SqlCheckpointStore, SqlExcursionRepository,
    SqlFlightRepository, SqlHotelRepository, SqlPolicyRepository,
};
use aerodesk_db::DbPool;

use crate::assistant::{Assistant, APOLOGY};
use crate::guardrails::{denial_message, ApprovalResponse, GuardrailDecision, GuardrailPolicy};
use crate::llm::build_clients;
use crate::policy::PolicyIndex;
use crate::prompts::PromptRenderer;
use crate::search::{DisabledSearch, TavilySearch, WebSearch};
use crate::tools::{ToolContext, ToolExecutor};

pub const LEAVE_SKILL_MESSAGE: &str = "Resuming dialog with the host assistant. Please reflect on the past \
     conversation and assist the user as needed.";

pub fn enter_skill_message(skill: Skill) -> String {
    let name = skill.display_name();
    format!(
        "The assistant is now the {name}. Reflect on the above conversation between the host assistant \
         and the user. The user's intent is unsatisfied. Use the provided tools to assist the user. \
         Remember, you are {name}, and the booking, update, other other action is not complete until \
         after you have successfully invoked the appropriate tool. If the user changes their mind or \
         needs help for other tasks, call the CompleteOrEscalate function to let the primary host \
         assistant take control. Do not mention who you are - just act as the proxy for the assistant."
    )
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Answered { answer: String },
    /// The turn is parked before a sensitive tool node.
    AwaitingApproval { owner: AssistantId, calls: Vec<ToolCall> },
}

pub struct AgentRuntime {
    assistant: Assistant,
    tools: ToolExecutor,
    checkpoints: Arc<dyn CheckpointStore>,
    guardrails: GuardrailPolicy,
    max_steps: u32,
}

impl AgentRuntime {
    pub fn new(
        assistant: Assistant,
        tools: ToolExecutor,
        checkpoints: Arc<dyn CheckpointStore>,
        guardrails: GuardrailPolicy,
        max_steps: u32,
    ) -> Self {
        Self { assistant, tools, checkpoints, guardrails, max_steps: max_steps.max(1) }
    }

    /// Wires the SQLite repositories and the configured model and search
    /// providers.
    pub fn from_config(config: &AppConfig, pool: DbPool) -> anyhow::Result<Self> {
        let clients = build_clients(&config.llm)?;
        let search: Arc<dyn WebSearch> = if config.search.api_key.is_some() {
            Arc::new(TavilySearch::from_config(&config.search, config.llm.timeout_secs)?)
        } else {
            Arc::new(DisabledSearch)
        };

        let policy =
            PolicyIndex::new(Arc::new(SqlPolicyRepository::new(pool.clone())), clients.embeddings);
        let tools = ToolExecutor::new(
            Arc::new(SqlFlightRepository::new(pool.clone())),
            Arc::new(SqlCarRentalRepository::new(pool.clone())),
            Arc::new(SqlHotelRepository::new(pool.clone())),
            Arc::new(SqlExcursionRepository::new(pool.clone())),
            policy,
            search,
        );
        let assistant = Assistant::new(
            clients.chat,
            PromptRenderer::new().context("failed to load prompt templates")?,
            DialogGraph::new(config.agent.layout),
            config.agent.max_parse_attempts,
        );

        Ok(Self::new(
            assistant,
            tools,
            Arc::new(SqlCheckpointStore::new(pool)),
            GuardrailPolicy::new(config.agent.require_approval),
            config.agent.max_steps_per_turn,
        ))
    }

    pub fn session(&self, config: SessionConfig) -> Session<'_> {
        Session { runtime: self, config }
    }

    fn graph(&self) -> &DialogGraph {
        self.assistant.graph()
    }
}

/// A conversation bound to one session id and, optionally, a signed-in
/// passenger. Holds no state itself; everything lives in the checkpoint store.
pub struct Session<'a> {
    runtime: &'a AgentRuntime,
    config: SessionConfig,
}

impl Session<'_> {
    pub fn id(&self) -> &SessionId {
        &self.config.session_id
    }

    pub async fn snapshot(&self) -> Result<Option<SessionSnapshot>, ApplicationError> {
        Ok(self.runtime.checkpoints.load(self.id()).await?)
    }

    /// Runs one user turn. A question sent while calls are waiting for
    /// approval is taken as the reason for denying them.
    pub async fn ask(&self, question: &str) -> Result<TurnOutcome, ApplicationError> {
        let mut snapshot = self.load_or_empty().await?;
        if snapshot.is_interrupted() {
            return self.resume_snapshot(snapshot, ApprovalResponse::from_user_input(question)).await;
        }

        snapshot.state.push(Message::user(question));
        let entry = self.runtime.graph().entry();
        self.drive(snapshot, entry).await
    }

    pub async fn resume(&self, response: ApprovalResponse) -> Result<TurnOutcome, ApplicationError> {
        let snapshot = self.load_or_empty().await?;
        if !snapshot.is_interrupted() {
            return Err(ApplicationError::NothingToResume(self.id().to_string()));
        }
        self.resume_snapshot(snapshot, response).await
    }

    /// Drops the persisted conversation. Returns whether there was one.
    pub async fn reset(&self) -> Result<bool, ApplicationError> {
        let existed = self.runtime.checkpoints.delete(self.id()).await?;
        info!(
            event_name = "session.reset",
            session_id = %self.id(),
            existed,
            "session reset"
        );
        Ok(existed)
    }

    async fn load_or_empty(&self) -> Result<SessionSnapshot, ApplicationError> {
        Ok(self
            .runtime
            .checkpoints
            .load(self.id())
            .await?
            .unwrap_or_else(|| SessionSnapshot::empty(self.id().clone())))
    }

    async fn resume_snapshot(
        &self,
        mut snapshot: SessionSnapshot,
        response: ApprovalResponse,
    ) -> Result<TurnOutcome, ApplicationError> {
        let Some(pending) = snapshot.pending.take() else {
            return Err(ApplicationError::NothingToResume(self.id().to_string()));
        };
        let owner = match pending {
            Node::SensitiveTools(owner) => owner,
            other => {
                return Err(DomainError::from(FlowTransitionError::MissingToolCall {
                    node: other.label(),
                })
                .into())
            }
        };

        match response {
            ApprovalResponse::Approve => {
                info!(
                    event_name = "session.approved",
                    session_id = %self.id(),
                    node = %pending.label(),
                    "pending tool calls approved"
                );
                let next = self.step(pending, &mut snapshot.state).await?;
                // The approved calls have run; a failure later in the turn must
                // not leave them pending for a second approval.
                self.save(&mut snapshot).await?;
                self.drive(snapshot, next).await
            }
            ApprovalResponse::Deny { reason } => {
                let calls = snapshot.state.pending_tool_calls().to_vec();
                info!(
                    event_name = "session.denied",
                    session_id = %self.id(),
                    node = %pending.label(),
                    calls = calls.len(),
                    "pending tool calls denied"
                );
                for call in calls {
                    snapshot.state.push(Message::tool_result(call.id, denial_message(&reason)));
                }
                self.drive(snapshot, Node::Assistant(owner)).await
            }
        }
    }

    async fn drive(
        &self,
        mut snapshot: SessionSnapshot,
        start: Node,
    ) -> Result<TurnOutcome, ApplicationError> {
        let graph = self.runtime.graph();
        let correlation_id = Uuid::new_v4().to_string();
        let mut node = start;
        let mut steps = 0_u32;

        while node != Node::End {
            steps += 1;
            if steps > self.runtime.max_steps {
                warn!(
                    event_name = "session.step_budget_exceeded",
                    session_id = %self.id(),
                    correlation_id = %correlation_id,
                    max_steps = self.runtime.max_steps,
                    "turn abandoned"
                );
                return Err(ApplicationError::StepBudgetExceeded {
                    max_steps: self.runtime.max_steps,
                });
            }

            let calls = snapshot.state.pending_tool_calls();
            if let GuardrailDecision::Interrupt { reason_code, tools } =
                self.runtime.guardrails.evaluate(graph, node, calls)
            {
                let outcome =
                    TurnOutcome::AwaitingApproval { owner: owner_of(node), calls: calls.to_vec() };
                info!(
                    event_name = "session.interrupted",
                    session_id = %self.id(),
                    correlation_id = %correlation_id,
                    node = %node.label(),
                    reason_code,
                    tools = ?tools,
                    "waiting for approval"
                );
                snapshot.pending = Some(node);
                self.save(&mut snapshot).await?;
                return Ok(outcome);
            }

            node = self.step(node, &mut snapshot.state).await?;
        }

        let answer = snapshot.state.final_answer().unwrap_or(APOLOGY).to_string();
        info!(
            event_name = "session.answered",
            session_id = %self.id(),
            correlation_id = %correlation_id,
            steps,
            stack_depth = snapshot.state.dialog_stack.len(),
            "turn complete"
        );
        snapshot.pending = None;
        self.save(&mut snapshot).await?;
        Ok(TurnOutcome::Answered { answer })
    }

    /// Executes one node and returns the next one.
    async fn step(&self, node: Node, state: &mut ConversationState) -> Result<Node, ApplicationError> {
        let graph = self.runtime.graph();
        let context = ToolContext { passenger_id: self.config.passenger_id.clone(), now: Utc::now() };

        match node {
            Node::FetchUserInfo => {
                let info = self.runtime.tools.fetch_user_flight_information(&context).await?;
                state.user_info = Some(info).filter(|info| !info.is_empty());
            }
            Node::Assistant(owner) => {
                self.runtime.assistant.invoke(owner, state, context.now).await?;
                return graph
                    .route_assistant(owner, state.pending_tool_calls())
                    .map_err(|error| DomainError::from(error).into());
            }
            Node::SafeTools(_) | Node::SensitiveTools(_) => {
                let calls = state.pending_tool_calls().to_vec();
                if calls.is_empty() {
                    return Err(DomainError::from(FlowTransitionError::MissingToolCall {
                        node: node.label(),
                    })
                    .into());
                }
                for call in calls {
                    let output = self.runtime.tools.execute_or_report(&call, &context).await;
                    state.push(Message::tool_result(call.id, output));
                }
            }
            Node::EnterSkill(skill) => {
                let call_id = first_call_id(node, state)?;
                state.dialog_stack.apply(graph.stack_transition(node).map_err(DomainError::from)?);
                state.push(Message::tool_result(call_id, enter_skill_message(skill)));
            }
            Node::LeaveSkill => {
                let call_id = first_call_id(node, state)?;
                state.dialog_stack.apply(graph.stack_transition(node).map_err(DomainError::from)?);
                state.push(Message::tool_result(call_id, LEAVE_SKILL_MESSAGE));
            }
            Node::End => return Ok(Node::End),
        }

        Ok(graph.next_after(node, &state.dialog_stack))
    }

    async fn save(&self, snapshot: &mut SessionSnapshot) -> Result<(), ApplicationError> {
        snapshot.updated_at = Utc::now();
        self.runtime.checkpoints.save(snapshot).await?;
        Ok(())
    }
}

fn owner_of(node: Node) -> AssistantId {
    match node {
        Node::Assistant(owner) | Node::SafeTools(owner) | Node::SensitiveTools(owner) => owner,
        Node::EnterSkill(skill) => AssistantId::Skill(skill),
        Node::FetchUserInfo | Node::LeaveSkill | Node::End => AssistantId::Primary,
    }
}

fn first_call_id(node: Node, state: &ConversationState) -> Result<String, ApplicationError> {
    state
        .pending_tool_calls()
        .first()
        .map(|call| call.id.clone())
        .ok_or_else(|| {
            DomainError::from(FlowTransitionError::MissingToolCall { node: node.label() }).into()
        })
}
