use std::process::ExitCode;

fn main() -> ExitCode {
    aerodesk_cli::run()
}
