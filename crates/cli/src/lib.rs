pub mod commands;

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::process::ExitCode;

use aerodesk_agent::ApprovalResponse;
use aerodesk_core::config::{AppConfig, LoadOptions, LogFormat};
use commands::session::SessionArgs;

#[derive(Debug, Parser)]
#[command(
    name = "aerodesk",
    about = "Aerodesk airline support assistant CLI",
    long_about = "Run support conversations against the travel database, approve or deny pending \
                  bookings, and operate migrations, seed data and readiness checks.",
    after_help = "Examples:\n  aerodesk seed\n  aerodesk ask --session demo --passenger \"3442 587242\" \"When is my flight?\"\n  aerodesk resume --session demo --approve\n  aerodesk doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct SessionTarget {
    #[arg(long = "session", help = "Conversation id used as the checkpoint key")]
    session_id: String,
    #[arg(long = "passenger", help = "Signed-in passenger id, e.g. \"3442 587242\"")]
    passenger_id: Option<String>,
}

impl From<SessionTarget> for SessionArgs {
    fn from(target: SessionTarget) -> Self {
        Self { session_id: target.session_id, passenger_id: target.passenger_id }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Reset and load the demo travel dataset with dates shifted to now")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model provider, web search and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Send one user message and run the turn to an answer or an approval stop")]
    Ask {
        #[command(flatten)]
        target: SessionTarget,
        #[arg(long, help = "Drop any saved conversation before asking")]
        fresh: bool,
        #[arg(help = "The user's message")]
        question: String,
    },
    #[command(about = "Approve or deny the tool calls an interrupted turn is waiting on")]
    #[command(group(ArgGroup::new("decision").required(true).args(["approve", "deny"])))]
    Resume {
        #[command(flatten)]
        target: SessionTarget,
        #[arg(long, help = "Run the pending tool calls")]
        approve: bool,
        #[arg(long, value_name = "REASON", help = "Refuse the pending tool calls with a reason")]
        deny: Option<String>,
    },
    #[command(about = "Delete the saved conversation for a session")]
    Reset {
        #[arg(long = "session")]
        session_id: String,
    },
}

fn init_logging() {
    use tracing::Level;
    use LogFormat::*;

    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Ask { target, fresh, question } => {
            commands::session::ask(&SessionArgs::from(target), &question, fresh)
        }
        Command::Resume { target, approve, deny } => {
            let response = match (approve, deny) {
                (true, _) => ApprovalResponse::Approve,
                (false, reason) => ApprovalResponse::Deny { reason: reason.unwrap_or_default() },
            };
            commands::session::resume(&SessionArgs::from(target), response)
        }
        Command::Reset { session_id } => {
            commands::session::reset(&SessionArgs { session_id, passenger_id: None })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn resume_requires_a_decision() {
        assert!(Cli::try_parse_from(["aerodesk", "resume", "--session", "s-1"]).is_err());
        assert!(Cli::try_parse_from([
            "aerodesk", "resume", "--session", "s-1", "--approve", "--deny", "no"
        ])
        .is_err());
    }

    #[test]
    fn ask_takes_session_passenger_and_question() {
        let cli = Cli::try_parse_from([
            "aerodesk",
            "ask",
            "--session",
            "demo",
            "--passenger",
            "3442 587242",
            "--fresh",
            "Am I allowed to update my flight?",
        ])
        .expect("parse");

        let Command::Ask { target, fresh, question } = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(target.session_id, "demo");
        assert_eq!(target.passenger_id.as_deref(), Some("3442 587242"));
        assert!(fresh);
        assert_eq!(question, "Am I allowed to update my flight?");
    }
}
