use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::conversation::{ConversationState, ToolCall};
use crate::domain::flight::PassengerId;
use crate::flows::states::Node;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub session_id: SessionId,
    pub passenger_id: Option<PassengerId>,
}

impl SessionConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: SessionId(session_id.into()), passenger_id: None }
    }

    pub fn with_passenger(mut self, passenger_id: impl Into<String>) -> Self {
        self.passenger_id = Some(PassengerId(passenger_id.into()));
        self
    }
}

/// Persisted between turns. `pending` is set only while a sensitive node
/// waits for approval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub state: ConversationState,
    pub pending: Option<Node>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn empty(session_id: SessionId) -> Self {
        Self { session_id, state: ConversationState::default(), pending: None, updated_at: Utc::now() }
    }

    pub fn is_interrupted(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_calls(&self) -> &[ToolCall] {
        if self.pending.is_some() {
            self.state.pending_tool_calls()
        } else {
            &[]
        }
    }
}
