use tracing::info;

use crate::commands::{async_runtime, load_config, open_database, CommandResult, StepFailure};
use aerodesk_db::TravelSeedDataset;

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seed_result = TravelSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = TravelSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<Vec<&'static str>, StepFailure> = if verification.all_present {
            info!(
                event_name = "cli.seed.completed",
                shift_seconds = seed_result.shift_seconds,
                "travel dataset seeded"
            );
            Ok(seed_result.tables)
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(tables) => CommandResult::success(
            "seed",
            format!(
                "travel demo dataset loaded with dates shifted to the current time: {}",
                tables.join(", ")
            ),
        ),
        Err(failure) => CommandResult::from_step("seed", failure),
    }
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
