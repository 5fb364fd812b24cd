//! Agent runtime for the airline support assistant.
//!
//! A turn is a walk over the dialog graph from `aerodesk_core::flows`:
//!
//! 1. **User info** (`tools`) - load the signed-in passenger's tickets
//! 2. **Assistant** (`assistant`) - prompt the model (`prompts`, `llm`) and
//!    parse its JSON command (`parser`), retrying on unusable output
//! 3. **Routing** - delegate to a sub-assistant, escalate back, run tools or
//!    finish with the final answer
//! 4. **Guardrails** (`guardrails`) - park the turn before sensitive tools
//!    until the user approves or denies
//!
//! `runtime::Session` is the entry point; it persists every turn through a
//! `CheckpointStore` so interrupted turns survive process restarts.
//!
//! The model never writes to storage directly. Every mutation goes through a
//! typed tool request validated before it reaches a repository.

pub mod assistant;
pub mod guardrails;
pub mod llm;
pub mod parser;
pub mod policy;
pub mod prompts;
pub mod runtime;
pub mod search;
pub mod tools;

pub use assistant::Assistant;
pub use guardrails::{ApprovalResponse, GuardrailPolicy};
pub use runtime::{AgentRuntime, Session, TurnOutcome};
pub use tools::{ToolExecutor, ToolRequest};
