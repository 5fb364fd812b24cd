use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::Executor;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{decode_error, RepositoryError};

/// The fixture's timestamps are written relative to this instant.
pub const REFERENCE_TIME: &str = "2024-04-25 12:00:00";

const TIMESTAMP_COLUMNS: &[(&str, &str)] = &[
    ("flights", "scheduled_departure"),
    ("flights", "scheduled_arrival"),
    ("flights", "actual_departure"),
    ("flights", "actual_arrival"),
];

const DATE_COLUMNS: &[(&str, &str)] = &[
    ("car_rentals", "start_date"),
    ("car_rentals", "end_date"),
    ("hotels", "checkin_date"),
    ("hotels", "checkout_date"),
];

/// Expected row counts after a fresh load.
const SEEDED_TABLES: &[(&str, i64)] = &[
    ("flights", 8),
    ("tickets", 3),
    ("ticket_flights", 3),
    ("boarding_passes", 2),
    ("car_rentals", 8),
    ("hotels", 10),
    ("trip_recommendations", 10),
    ("policies", 5),
];

/// Demo travel dataset: a handful of passengers, flights around Basel and
/// Zurich, bookable rentals, hotels and excursions, and the policy handbook.
///
/// Loading replaces the travel tables and then moves every date forward so
/// that the upcoming flights are upcoming relative to the wall clock.
pub struct TravelSeedDataset;

impl TravelSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/travel_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let reference = NaiveDateTime::parse_from_str(REFERENCE_TIME, "%Y-%m-%d %H:%M:%S")
            .map_err(decode_error)?;
        let reference = Utc.from_utc_datetime(&reference);
        let shift_seconds = (Utc::now() - reference).num_seconds();
        let modifier = format!("{shift_seconds:+} seconds");

        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;

        for (table, column) in TIMESTAMP_COLUMNS {
            let statement = format!("UPDATE {table} SET {column} = datetime({column}, ?)");
            sqlx::query(&statement).bind(modifier.as_str()).execute(&mut *tx).await?;
        }
        for (table, column) in DATE_COLUMNS {
            let statement = format!("UPDATE {table} SET {column} = date({column}, ?)");
            sqlx::query(&statement).bind(modifier.as_str()).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(event_name = "seed.loaded", shift_seconds, "travel dataset loaded");
        Ok(SeedResult {
            shift_seconds,
            tables: SEEDED_TABLES.iter().map(|(table, _)| *table).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (table, expected) in SEEDED_TABLES {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table}"))
                .fetch_one(pool)
                .await?;
            checks.push((*table, count == *expected));
        }

        let demo_passenger_tickets: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM tickets WHERE passenger_id = '3442 587242'")
                .fetch_one(pool)
                .await?;
        checks.push(("demo-passenger-tickets", demo_passenger_tickets == 2));

        let upcoming_flight: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM flights
                           WHERE flight_id = 19250 AND scheduled_departure > datetime('now'))",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("dates-shifted", upcoming_flight == 1));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub shift_seconds: i64,
    pub tables: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
