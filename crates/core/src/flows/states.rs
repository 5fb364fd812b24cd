use serde::{Deserialize, Serialize};

/// Specialized sub-assistants the primary assistant can hand a turn to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    UpdateFlight,
    BookCarRental,
    BookHotel,
    BookExcursion,
}

impl Skill {
    pub const ALL: [Skill; 4] =
        [Skill::UpdateFlight, Skill::BookCarRental, Skill::BookHotel, Skill::BookExcursion];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdateFlight => "update_flight",
            Self::BookCarRental => "book_car_rental",
            Self::BookHotel => "book_hotel",
            Self::BookExcursion => "book_excursion",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::UpdateFlight => "Flight Updates & Booking Assistant",
            Self::BookCarRental => "Car Rental Assistant",
            Self::BookHotel => "Hotel Booking Assistant",
            Self::BookExcursion => "Trip Recommendation Assistant",
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "skill")]
pub enum AssistantId {
    Primary,
    Skill(Skill),
}

impl AssistantId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary_assistant",
            Self::Skill(skill) => skill.as_str(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "node", content = "owner")]
pub enum Node {
    FetchUserInfo,
    Assistant(AssistantId),
    SafeTools(AssistantId),
    SensitiveTools(AssistantId),
    EnterSkill(Skill),
    LeaveSkill,
    End,
}

impl Node {
    pub fn label(&self) -> String {
        match self {
            Self::FetchUserInfo => "fetch_user_info".to_string(),
            Self::Assistant(owner) => owner.as_str().to_string(),
            Self::SafeTools(owner) => format!("{}_safe_tools", owner.as_str()),
            Self::SensitiveTools(owner) => format!("{}_sensitive_tools", owner.as_str()),
            Self::EnterSkill(skill) => format!("enter_{}", skill.as_str()),
            Self::LeaveSkill => "leave_skill".to_string(),
            Self::End => "__end__".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackTransition {
    Keep,
    Push(Skill),
    Pop,
}

/// Which sub-assistant owns the turn. Empty means the primary assistant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogStack(Vec<Skill>);

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, transition: StackTransition) {
        match transition {
            StackTransition::Keep => {}
            StackTransition::Push(skill) => self.0.push(skill),
            StackTransition::Pop => {
                self.0.pop();
            }
        }
    }

    pub fn current(&self) -> Option<Skill> {
        self.0.last().copied()
    }

    pub fn owner(&self) -> AssistantId {
        self.current().map(AssistantId::Skill).unwrap_or(AssistantId::Primary)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Skill] {
        &self.0
    }
}
