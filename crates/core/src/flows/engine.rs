use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversation::ToolCall;
use crate::domain::tool::{ToolId, ToolKind};
use crate::flows::states::{AssistantId, DialogStack, Node, Skill, StackTransition};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphLayout {
    /// Primary assistant plus one sub-assistant per skill.
    #[default]
    Delegating,
    /// One assistant owning every domain tool.
    Flat,
}

impl GraphLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delegating => "delegating",
            Self::Flat => "flat",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delegating" => Some(Self::Delegating),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }
}

/// Tools an assistant may request, split by how the graph treats them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolset {
    pub safe: Vec<ToolId>,
    pub sensitive: Vec<ToolId>,
    pub control: Vec<ToolId>,
}

impl Toolset {
    pub fn all(&self) -> impl Iterator<Item = ToolId> + '_ {
        self.control.iter().chain(self.safe.iter()).chain(self.sensitive.iter()).copied()
    }

    pub fn contains(&self, tool: ToolId) -> bool {
        self.all().any(|candidate| candidate == tool)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.all().map(ToolId::name).collect()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("`{tool}` is not available to {owner}")]
    ToolOutsideToolset { owner: String, tool: ToolId },
    #[error("{node} cannot run without a pending tool call")]
    MissingToolCall { node: String },
    #[error("{0} is not active in the {1} layout")]
    SkillUnavailable(Skill, &'static str),
}

pub fn delegation_target(tool: ToolId) -> Option<Skill> {
    match tool {
        ToolId::ToFlightBookingAssistant => Some(Skill::UpdateFlight),
        ToolId::ToBookCarRental => Some(Skill::BookCarRental),
        ToolId::ToHotelBookingAssistant => Some(Skill::BookHotel),
        ToolId::ToBookExcursion => Some(Skill::BookExcursion),
        _ => None,
    }
}

/// Pure routing over the assistant graph; execution lives in the agent runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DialogGraph {
    layout: GraphLayout,
}

impl DialogGraph {
    pub fn new(layout: GraphLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> GraphLayout {
        self.layout
    }

    pub fn entry(&self) -> Node {
        Node::FetchUserInfo
    }

    pub fn toolset(&self, owner: AssistantId) -> Toolset {
        use ToolId::*;

        match (self.layout, owner) {
            (GraphLayout::Flat, _) => Toolset {
                safe: vec![
                    WebSearch,
                    FetchUserFlightInformation,
                    SearchFlights,
                    LookupPolicy,
                    SearchCarRentals,
                    SearchHotels,
                    SearchTripRecommendations,
                ],
                sensitive: ToolId::ALL
                    .into_iter()
                    .filter(|tool| tool.kind() == ToolKind::Sensitive)
                    .collect(),
                control: Vec::new(),
            },
            (GraphLayout::Delegating, AssistantId::Primary) => Toolset {
                safe: vec![WebSearch, SearchFlights, LookupPolicy],
                sensitive: Vec::new(),
                control: vec![
                    ToFlightBookingAssistant,
                    ToBookCarRental,
                    ToHotelBookingAssistant,
                    ToBookExcursion,
                ],
            },
            (GraphLayout::Delegating, AssistantId::Skill(skill)) => {
                let (safe, sensitive) = match skill {
                    Skill::UpdateFlight => (
                        vec![SearchFlights, FetchUserFlightInformation],
                        vec![UpdateTicketToNewFlight, CancelTicket],
                    ),
                    Skill::BookCarRental => {
                        (vec![SearchCarRentals], vec![BookCarRental, UpdateCarRental, CancelCarRental])
                    }
                    Skill::BookHotel => {
                        (vec![SearchHotels], vec![BookHotel, UpdateHotel, CancelHotel])
                    }
                    Skill::BookExcursion => (
                        vec![SearchTripRecommendations],
                        vec![BookExcursion, UpdateExcursion, CancelExcursion],
                    ),
                };
                Toolset { safe, sensitive, control: vec![CompleteOrEscalate] }
            }
        }
    }

    /// Where a fresh user turn lands once user info is loaded.
    pub fn route_to_workflow(&self, stack: &DialogStack) -> Node {
        match self.layout {
            GraphLayout::Flat => Node::Assistant(AssistantId::Primary),
            GraphLayout::Delegating => Node::Assistant(stack.owner()),
        }
    }

    /// Conditional edge out of an assistant node.
    pub fn route_assistant(
        &self,
        owner: AssistantId,
        calls: &[ToolCall],
    ) -> Result<Node, FlowTransitionError> {
        let Some(first) = calls.first() else {
            return Ok(Node::End);
        };

        let toolset = self.toolset(owner);
        if let Some(call) = calls.iter().find(|call| !toolset.contains(call.tool)) {
            return Err(FlowTransitionError::ToolOutsideToolset {
                owner: owner.as_str().to_string(),
                tool: call.tool,
            });
        }

        match owner {
            AssistantId::Primary => {
                if let Some(skill) = delegation_target(first.tool) {
                    return Ok(Node::EnterSkill(skill));
                }
            }
            AssistantId::Skill(_) => {
                if calls.iter().any(|call| call.tool == ToolId::CompleteOrEscalate) {
                    return Ok(Node::LeaveSkill);
                }
            }
        }

        if calls.iter().all(|call| toolset.safe.contains(&call.tool)) {
            Ok(Node::SafeTools(owner))
        } else {
            Ok(Node::SensitiveTools(owner))
        }
    }

    /// Fixed edge out of every non-assistant node.
    pub fn next_after(&self, node: Node, stack: &DialogStack) -> Node {
        match node {
            Node::FetchUserInfo => self.route_to_workflow(stack),
            Node::SafeTools(owner) | Node::SensitiveTools(owner) => Node::Assistant(owner),
            Node::EnterSkill(skill) => Node::Assistant(AssistantId::Skill(skill)),
            Node::LeaveSkill => Node::Assistant(AssistantId::Primary),
            Node::Assistant(_) | Node::End => Node::End,
        }
    }

    pub fn stack_transition(&self, node: Node) -> Result<StackTransition, FlowTransitionError> {
        match node {
            Node::EnterSkill(skill) if self.layout == GraphLayout::Flat => {
                Err(FlowTransitionError::SkillUnavailable(skill, self.layout.as_str()))
            }
            Node::EnterSkill(skill) => Ok(StackTransition::Push(skill)),
            Node::LeaveSkill => Ok(StackTransition::Pop),
            _ => Ok(StackTransition::Keep),
        }
    }

    pub fn interrupts_before(&self, node: Node) -> bool {
        matches!(node, Node::SensitiveTools(_))
    }
}
