pub mod engine;
pub mod states;

pub use engine::{delegation_target, DialogGraph, FlowTransitionError, GraphLayout, Toolset};
pub use states::{AssistantId, DialogStack, Node, Skill, StackTransition};
