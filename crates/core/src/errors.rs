use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no passenger id configured for this session")]
    MissingPassengerId,
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidToolArguments { tool: String, message: String },
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("model produced no usable response after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("turn exceeded {max_steps} graph steps")]
    StepBudgetExceeded { max_steps: u32 },
    #[error("session `{0}` has no interrupted turn to resume")]
    NothingToResume(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::MissingPassengerId) => "missing_identity",
            Self::Domain(_) => "domain",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "configuration",
            Self::RetriesExhausted { .. } => "model_output",
            Self::StepBudgetExceeded { .. } => "step_budget",
            Self::NothingToResume(_) => "nothing_to_resume",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::MissingPassengerId) => {
                "No passenger is signed in for this session. Provide a passenger id and retry."
            }
            Self::Domain(_) => "The request could not be processed. Check inputs and try again.",
            Self::Persistence(_) | Self::Integration(_) => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Configuration(_) => "An unexpected internal error occurred.",
            Self::RetriesExhausted { .. } | Self::StepBudgetExceeded { .. } => {
                "Sorry, I could not complete that request. Please rephrase and try again."
            }
            Self::NothingToResume(_) => "There is no pending action waiting for approval.",
        }
    }
}
