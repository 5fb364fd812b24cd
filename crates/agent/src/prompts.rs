use chrono::{DateTime, Utc};
use tera::{Context, Tera};
use thiserror::Error;

use aerodesk_core::flows::{AssistantId, GraphLayout, Skill, Toolset};

const RESPONSE_FORMAT: &str = "response_format.txt.tera";
const PRIMARY: &str = "primary.txt.tera";
const FLAT: &str = "flat.txt.tera";
const SKILL: &str = "skill.txt.tera";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template error: {0}")]
    Template(String),
}

/// System prompts for every assistant, rendered per model invocation so the
/// current time and user info are fresh.
#[derive(Clone, Debug)]
pub struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                RESPONSE_FORMAT,
                include_str!("../../../templates/prompts/response_format.txt.tera"),
            ),
            (PRIMARY, include_str!("../../../templates/prompts/primary.txt.tera")),
            (FLAT, include_str!("../../../templates/prompts/flat.txt.tera")),
            (SKILL, include_str!("../../../templates/prompts/skill.txt.tera")),
        ])
        .map_err(|error| PromptError::Template(error.to_string()))?;

        Ok(Self { tera })
    }

    pub fn render(
        &self,
        layout: GraphLayout,
        owner: AssistantId,
        toolset: &Toolset,
        user_info: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, PromptError> {
        let tool_descs = toolset
            .all()
            .map(|tool| tool.descriptor().render())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut context = Context::new();
        context.insert("tool_descs", &tool_descs);
        context.insert("user_info", user_info.unwrap_or("No flight information available."));
        context.insert("time", &now.format("%Y-%m-%d %H:%M:%S").to_string());

        let template = match (layout, owner) {
            (GraphLayout::Flat, _) => FLAT,
            (GraphLayout::Delegating, AssistantId::Primary) => PRIMARY,
            (GraphLayout::Delegating, AssistantId::Skill(skill)) => {
                context.insert("skill", skill.as_str());
                context.insert("escalation_examples", escalation_examples(skill));
                SKILL
            }
        };

        self.tera
            .render(template, &context)
            .map_err(|error| PromptError::Template(error.to_string()))
    }
}

fn escalation_examples(skill: Skill) -> &'static [&'static str] {
    match skill {
        Skill::UpdateFlight => &[
            "what's the weather like this time of year?",
            "nevermind i think I'll book separately",
            "Flight update confirmed",
        ],
        Skill::BookCarRental => &[
            "what's the weather like this time of year?",
            "What flights are available?",
            "nevermind i think I'll book separately",
            "Oh wait i haven't booked my flight yet i'll do that first",
            "Car rental booking confirmed",
        ],
        Skill::BookHotel => &[
            "what's the weather like this time of year?",
            "nevermind i think I'll book separately",
            "i need to figure out transportation while i'm there",
            "Oh wait i haven't booked my flight yet i'll do that first",
            "Hotel booking confirmed",
        ],
        Skill::BookExcursion => &[
            "nevermind i think I'll book separately",
            "i need to figure out transportation while i'm there",
            "Oh wait i haven't booked my flight yet i'll do that first",
            "Excursion booking confirmed!",
        ],
    }
}
