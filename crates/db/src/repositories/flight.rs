use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use aerodesk_core::domain::flight::{
    Flight, FlightId, FlightSearch, PassengerFlight, PassengerId, TicketNo, TicketSegment,
};
use aerodesk_core::domain::time::{format_timestamp, parse_timestamp};

use super::{decode_error, FlightRepository, RepositoryError};
use crate::DbPool;

pub struct SqlFlightRepository {
    pool: DbPool,
}

impl SqlFlightRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column).map_err(decode_error)?;
    parse_timestamp(&raw).map_err(decode_error)
}

fn optional_timestamp_column(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let raw: Option<String> = row.try_get(column).map_err(decode_error)?;
    raw.map(|value| parse_timestamp(&value).map_err(decode_error)).transpose()
}

fn row_to_flight(row: &SqliteRow) -> Result<Flight, RepositoryError> {
    Ok(Flight {
        flight_id: FlightId(row.try_get("flight_id").map_err(decode_error)?),
        flight_no: row.try_get("flight_no").map_err(decode_error)?,
        scheduled_departure: timestamp_column(row, "scheduled_departure")?,
        scheduled_arrival: timestamp_column(row, "scheduled_arrival")?,
        departure_airport: row.try_get("departure_airport").map_err(decode_error)?,
        arrival_airport: row.try_get("arrival_airport").map_err(decode_error)?,
        status: row.try_get("status").map_err(decode_error)?,
        aircraft_code: row.try_get("aircraft_code").map_err(decode_error)?,
        actual_departure: optional_timestamp_column(row, "actual_departure")?,
        actual_arrival: optional_timestamp_column(row, "actual_arrival")?,
    })
}

fn row_to_passenger_flight(row: &SqliteRow) -> Result<PassengerFlight, RepositoryError> {
    Ok(PassengerFlight {
        ticket_no: TicketNo(row.try_get("ticket_no").map_err(decode_error)?),
        book_ref: row.try_get("book_ref").map_err(decode_error)?,
        flight_id: FlightId(row.try_get("flight_id").map_err(decode_error)?),
        flight_no: row.try_get("flight_no").map_err(decode_error)?,
        departure_airport: row.try_get("departure_airport").map_err(decode_error)?,
        arrival_airport: row.try_get("arrival_airport").map_err(decode_error)?,
        scheduled_departure: timestamp_column(row, "scheduled_departure")?,
        scheduled_arrival: timestamp_column(row, "scheduled_arrival")?,
        seat_no: row.try_get("seat_no").map_err(decode_error)?,
        fare_conditions: row.try_get("fare_conditions").map_err(decode_error)?,
    })
}

const FLIGHT_COLUMNS: &str = "flight_id, flight_no, scheduled_departure, scheduled_arrival,
    departure_airport, arrival_airport, status, aircraft_code, actual_departure, actual_arrival";

#[async_trait::async_trait]
impl FlightRepository for SqlFlightRepository {
    async fn passenger_flights(
        &self,
        passenger_id: &PassengerId,
    ) -> Result<Vec<PassengerFlight>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT t.ticket_no, t.book_ref, f.flight_id, f.flight_no, f.departure_airport,
                    f.arrival_airport, f.scheduled_departure, f.scheduled_arrival,
                    bp.seat_no, tf.fare_conditions
             FROM tickets t
             JOIN ticket_flights tf ON t.ticket_no = tf.ticket_no
             JOIN flights f ON tf.flight_id = f.flight_id
             LEFT JOIN boarding_passes bp
                 ON bp.ticket_no = t.ticket_no AND bp.flight_id = f.flight_id
             WHERE t.passenger_id = ?
             ORDER BY f.scheduled_departure ASC",
        )
        .bind(&passenger_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_passenger_flight).collect()
    }

    async fn search(&self, search: &FlightSearch) -> Result<Vec<Flight>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE 1 = 1"));

        if let Some(departure_airport) = &search.departure_airport {
            builder.push(" AND departure_airport = ").push_bind(departure_airport.clone());
        }
        if let Some(arrival_airport) = &search.arrival_airport {
            builder.push(" AND arrival_airport = ").push_bind(arrival_airport.clone());
        }
        if let Some(start_time) = &search.start_time {
            builder.push(" AND scheduled_departure >= ").push_bind(format_timestamp(start_time));
        }
        if let Some(end_time) = &search.end_time {
            builder.push(" AND scheduled_departure <= ").push_bind(format_timestamp(end_time));
        }
        builder.push(" ORDER BY scheduled_departure ASC LIMIT ").push_bind(i64::from(search.limit));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_flight).collect()
    }

    async fn find_flight(&self, id: FlightId) -> Result<Option<Flight>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE flight_id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_flight).transpose()
    }

    async fn find_ticket_segment(
        &self,
        ticket_no: &TicketNo,
    ) -> Result<Option<TicketSegment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT tf.ticket_no, t.passenger_id, tf.flight_id
             FROM ticket_flights tf
             JOIN tickets t ON t.ticket_no = tf.ticket_no
             WHERE tf.ticket_no = ?
             LIMIT 1",
        )
        .bind(&ticket_no.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<TicketSegment, RepositoryError> {
            Ok(TicketSegment {
                ticket_no: TicketNo(row.try_get("ticket_no").map_err(decode_error)?),
                passenger_id: PassengerId(row.try_get("passenger_id").map_err(decode_error)?),
                flight_id: FlightId(row.try_get("flight_id").map_err(decode_error)?),
            })
        })
        .transpose()
    }

    async fn reassign_ticket(
        &self,
        ticket_no: &TicketNo,
        new_flight: FlightId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE ticket_flights SET flight_id = ? WHERE ticket_no = ?")
            .bind(new_flight.0)
            .bind(&ticket_no.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn remove_ticket_segment(&self, ticket_no: &TicketNo) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM ticket_flights WHERE ticket_no = ?")
            .bind(&ticket_no.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use aerodesk_core::domain::flight::{FlightId, FlightSearch, PassengerId, TicketNo};

    use super::SqlFlightRepository;
    use crate::repositories::FlightRepository;
    use crate::{connect_with_settings, migrations, TravelSeedDataset};

    async fn seeded_repo() -> SqlFlightRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        TravelSeedDataset::load(&pool).await.expect("seed");
        SqlFlightRepository::new(pool)
    }

    #[tokio::test]
    async fn passenger_flights_join_seat_and_fare() {
        let repo = seeded_repo().await;
        let flights = repo
            .passenger_flights(&PassengerId("3442 587242".to_string()))
            .await
            .expect("passenger flights");

        assert_eq!(flights.len(), 2);
        let first = &flights[0];
        assert_eq!(first.ticket_no.0, "7240005432906569");
        assert_eq!(first.seat_no.as_deref(), Some("18E"));
        assert_eq!(first.fare_conditions, "Economy");
    }

    #[tokio::test]
    async fn search_filters_route_window_and_limit() {
        let repo = seeded_repo().await;
        let all_routes = repo
            .search(&FlightSearch {
                departure_airport: Some("CDG".to_string()),
                arrival_airport: Some("BSL".to_string()),
                limit: FlightSearch::DEFAULT_LIMIT,
                ..FlightSearch::default()
            })
            .await
            .expect("search");
        assert_eq!(all_routes.len(), 5);
        assert!(all_routes.iter().all(|flight| flight.departure_airport == "CDG"));

        let windowed = repo
            .search(&FlightSearch {
                departure_airport: Some("CDG".to_string()),
                start_time: Some(Utc::now() + Duration::days(4)),
                end_time: Some(Utc::now() + Duration::days(8)),
                limit: 2,
                ..FlightSearch::default()
            })
            .await
            .expect("windowed search");
        assert_eq!(windowed.len(), 2);
        assert_eq!(windowed[0].flight_id, FlightId(19250));
    }

    #[tokio::test]
    async fn reassign_and_remove_touch_ticket_segments() {
        let repo = seeded_repo().await;
        let ticket = TicketNo("7240005432906569".to_string());

        let segment = repo.find_ticket_segment(&ticket).await.expect("find").expect("segment");
        assert_eq!(segment.flight_id, FlightId(19250));

        assert_eq!(repo.reassign_ticket(&ticket, FlightId(19251)).await.expect("reassign"), 1);
        let moved = repo.find_ticket_segment(&ticket).await.expect("find").expect("segment");
        assert_eq!(moved.flight_id, FlightId(19251));

        assert_eq!(repo.remove_ticket_segment(&ticket).await.expect("remove"), 1);
        assert!(repo.find_ticket_segment(&ticket).await.expect("find").is_none());
        assert!(repo.find_flight(FlightId(19251)).await.expect("flight").is_some());
    }
}
