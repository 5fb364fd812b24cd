use tracing::info;

use aerodesk_agent::{AgentRuntime, ApprovalResponse, TurnOutcome};
use aerodesk_core::config::AppConfig;
use aerodesk_core::domain::conversation::ToolCall;
use aerodesk_core::domain::session::SessionConfig;
use aerodesk_core::errors::ApplicationError;
use aerodesk_db::DbPool;

use crate::commands::{async_runtime, load_config, open_database, CommandResult, StepFailure};

#[derive(Clone, Debug)]
pub struct SessionArgs {
    pub session_id: String,
    pub passenger_id: Option<String>,
}

impl SessionArgs {
    fn config(&self) -> SessionConfig {
        let config = SessionConfig::new(self.session_id.clone());
        match &self.passenger_id {
            Some(passenger_id) => config.with_passenger(passenger_id.clone()),
            None => config,
        }
    }
}

enum TurnRequest<'a> {
    Ask { question: &'a str, fresh: bool },
    Resume(ApprovalResponse),
}

pub fn ask(args: &SessionArgs, question: &str, fresh: bool) -> CommandResult {
    run_turn("ask", args, TurnRequest::Ask { question, fresh })
}

pub fn resume(args: &SessionArgs, response: ApprovalResponse) -> CommandResult {
    run_turn("resume", args, TurnRequest::Resume(response))
}

pub fn reset(args: &SessionArgs) -> CommandResult {
    let config = match load_config("reset") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("reset") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let agent = agent_runtime(&config, pool.clone())?;
        let existed = agent.session(args.config()).reset().await.map_err(turn_failure);
        pool.close().await;
        existed
    });

    match result {
        Ok(true) => CommandResult::success("reset", format!("session `{}` reset", args.session_id)),
        Ok(false) => CommandResult::success(
            "reset",
            format!("session `{}` had no saved conversation", args.session_id),
        ),
        Err(failure) => CommandResult::from_step("reset", failure),
    }
}

fn run_turn(command: &str, args: &SessionArgs, request: TurnRequest<'_>) -> CommandResult {
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime(command) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let agent = agent_runtime(&config, pool.clone())?;
        let session = agent.session(args.config());
        let outcome = match request {
            TurnRequest::Ask { question, fresh } => {
                if fresh {
                    session.reset().await.map_err(turn_failure)?;
                }
                session.ask(question).await
            }
            TurnRequest::Resume(response) => session.resume(response).await,
        }
        .map_err(turn_failure);
        pool.close().await;
        outcome
    });

    match result {
        Ok(TurnOutcome::Answered { answer }) => {
            info!(
                event_name = "cli.turn.answered",
                session_id = %args.session_id,
                command,
                "turn answered"
            );
            CommandResult::success(command, answer)
        }
        Ok(TurnOutcome::AwaitingApproval { owner, calls }) => {
            info!(
                event_name = "cli.turn.interrupted",
                session_id = %args.session_id,
                owner = owner.as_str(),
                calls = calls.len(),
                "turn waiting for approval"
            );
            CommandResult::awaiting_approval(command, approval_prompt(&args.session_id, &calls))
        }
        Err(failure) => CommandResult::from_step(command, failure),
    }
}

fn agent_runtime(config: &AppConfig, pool: DbPool) -> Result<AgentRuntime, StepFailure> {
    AgentRuntime::from_config(config, pool)
        .map_err(|error| ("agent_init", format!("{error:#}"), 7u8))
}

fn turn_failure(error: ApplicationError) -> StepFailure {
    let exit_code = match &error {
        ApplicationError::NothingToResume(_) => 9,
        _ => 8,
    };
    (error.error_class(), format!("{}: {error}", error.user_message()), exit_code)
}

fn approval_prompt(session_id: &str, calls: &[ToolCall]) -> String {
    let requested = calls
        .iter()
        .map(|call| format!("{} {}", call.tool.name(), call.args))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "approval required for: {requested}. Run `aerodesk resume --session {session_id} --approve` \
         or `--deny <reason>`"
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use aerodesk_core::domain::conversation::ToolCall;
    use aerodesk_core::domain::tool::ToolId;
    use aerodesk_core::errors::ApplicationError;

    use super::{approval_prompt, turn_failure};

    #[test]
    fn approval_prompt_lists_tool_and_arguments() {
        let calls = [ToolCall::new(ToolId::BookHotel, json!({"hotel_id": 3}))];
        let prompt = approval_prompt("s-1", &calls);
        assert!(prompt.starts_with("approval required for: book_hotel_tool {\"hotel_id\":3}."));
        assert!(prompt.contains("aerodesk resume --session s-1 --approve"));
    }

    #[test]
    fn nothing_to_resume_has_its_own_exit_code() {
        let (class, _, code) = turn_failure(ApplicationError::NothingToResume("s-1".to_string()));
        assert_eq!((class, code), ("nothing_to_resume", 9));

        let (class, _, code) = turn_failure(ApplicationError::RetriesExhausted { attempts: 5 });
        assert_eq!((class, code), ("model_output", 8));
    }
}
