use aerodesk_core::domain::conversation::ToolCall;
use aerodesk_core::flows::{DialogGraph, Node};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    /// Halt before the node; the listed tools wait for the user.
    Interrupt { reason_code: &'static str, tools: Vec<&'static str> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub require_approval: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { require_approval: true }
    }
}

impl GuardrailPolicy {
    pub fn new(require_approval: bool) -> Self {
        Self { require_approval }
    }

    pub fn evaluate(&self, graph: &DialogGraph, node: Node, calls: &[ToolCall]) -> GuardrailDecision {
        if !self.require_approval || !graph.interrupts_before(node) {
            return GuardrailDecision::Allow;
        }
        GuardrailDecision::Interrupt {
            reason_code: "sensitive_tool_requires_approval",
            tools: calls.iter().map(|call| call.tool.name()).collect(),
        }
    }
}

/// The user's answer to an interrupted turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovalResponse {
    Approve,
    Deny { reason: String },
}

impl ApprovalResponse {
    /// `y` approves; any other input is taken as the reason for a denial.
    pub fn from_user_input(input: &str) -> Self {
        match input.trim() {
            "y" | "Y" => Self::Approve,
            reason => Self::Deny { reason: reason.to_string() },
        }
    }
}

pub fn denial_message(reason: &str) -> String {
    format!(
        "API call denied by user. Reasoning: '{reason}'. Continue assisting, accounting for the user's input."
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use aerodesk_core::domain::conversation::ToolCall;
    use aerodesk_core::domain::tool::ToolId;
    use aerodesk_core::flows::{AssistantId, DialogGraph, Node, Skill};

    use super::{denial_message, ApprovalResponse, GuardrailDecision, GuardrailPolicy};

    const HOTEL: AssistantId = AssistantId::Skill(Skill::BookHotel);

    #[test]
    fn sensitive_node_is_interrupted() {
        let policy = GuardrailPolicy::default();
        let calls = [ToolCall::new(ToolId::BookHotel, json!({"hotel_id": 3}))];
        let decision =
            policy.evaluate(&DialogGraph::default(), Node::SensitiveTools(HOTEL), &calls);

        assert_eq!(
            decision,
            GuardrailDecision::Interrupt {
                reason_code: "sensitive_tool_requires_approval",
                tools: vec!["book_hotel_tool"],
            }
        );
    }

    #[test]
    fn safe_nodes_and_disabled_approval_are_allowed() {
        let graph = DialogGraph::default();
        let calls = [ToolCall::new(ToolId::SearchHotels, json!({}))];

        assert_eq!(
            GuardrailPolicy::default().evaluate(&graph, Node::SafeTools(HOTEL), &calls),
            GuardrailDecision::Allow
        );
        assert_eq!(
            GuardrailPolicy::new(false).evaluate(&graph, Node::SensitiveTools(HOTEL), &calls),
            GuardrailDecision::Allow
        );
    }

    #[test]
    fn anything_but_y_is_a_denial_reason() {
        assert_eq!(ApprovalResponse::from_user_input(" y "), ApprovalResponse::Approve);
        assert_eq!(
            ApprovalResponse::from_user_input("too expensive"),
            ApprovalResponse::Deny { reason: "too expensive".to_string() }
        );
        assert_eq!(
            denial_message("too expensive"),
            "API call denied by user. Reasoning: 'too expensive'. Continue assisting, accounting for the user's input."
        );
    }
}
