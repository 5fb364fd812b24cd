use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use aerodesk_core::domain::booking::{
    CarRental, DateRangeUpdate, Hotel, HotelId, RecommendationId, RentalId, StaySearch,
    TripRecommendation, TripSearch,
};
use aerodesk_core::domain::flight::{
    Flight, FlightId, FlightSearch, PassengerFlight, PassengerId, TicketNo, TicketSegment,
};
use aerodesk_core::domain::policy::PolicySection;
use aerodesk_core::domain::session::{SessionId, SessionSnapshot};
use aerodesk_core::domain::time::parse_date;
use aerodesk_core::errors::ApplicationError;

pub mod car_rental;
pub mod checkpoint;
pub mod excursion;
pub mod flight;
pub mod hotel;
pub mod memory;
pub mod policy;

pub use car_rental::SqlCarRentalRepository;
pub use checkpoint::SqlCheckpointStore;
pub use excursion::SqlExcursionRepository;
pub use flight::SqlFlightRepository;
pub use hotel::SqlHotelRepository;
pub use memory::{InMemoryCheckpointStore, InMemoryPolicyRepository};
pub use policy::SqlPolicyRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn date_column(row: &SqliteRow, column: &str) -> Result<NaiveDate, RepositoryError> {
    let raw: String = row.try_get(column).map_err(decode_error)?;
    parse_date(&raw).map_err(decode_error)
}

pub(crate) fn like_pattern(value: &str) -> String {
    format!("%{}%", value.trim())
}

#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn passenger_flights(
        &self,
        passenger_id: &PassengerId,
    ) -> Result<Vec<PassengerFlight>, RepositoryError>;

    async fn search(&self, search: &FlightSearch) -> Result<Vec<Flight>, RepositoryError>;

    async fn find_flight(&self, id: FlightId) -> Result<Option<Flight>, RepositoryError>;

    async fn find_ticket_segment(
        &self,
        ticket_no: &TicketNo,
    ) -> Result<Option<TicketSegment>, RepositoryError>;

    /// Points the ticket's segment at another flight. Returns rows touched.
    async fn reassign_ticket(
        &self,
        ticket_no: &TicketNo,
        new_flight: FlightId,
    ) -> Result<u64, RepositoryError>;

    async fn remove_ticket_segment(&self, ticket_no: &TicketNo) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait CarRentalRepository: Send + Sync {
    async fn search(&self, search: &StaySearch) -> Result<Vec<CarRental>, RepositoryError>;
    async fn find_by_id(&self, id: RentalId) -> Result<Option<CarRental>, RepositoryError>;
    async fn set_booked(&self, id: RentalId, booked: bool) -> Result<u64, RepositoryError>;
    async fn update_dates(
        &self,
        id: RentalId,
        update: &DateRangeUpdate,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait HotelRepository: Send + Sync {
    async fn search(&self, search: &StaySearch) -> Result<Vec<Hotel>, RepositoryError>;
    async fn find_by_id(&self, id: HotelId) -> Result<Option<Hotel>, RepositoryError>;
    async fn set_booked(&self, id: HotelId, booked: bool) -> Result<u64, RepositoryError>;
    async fn update_dates(
        &self,
        id: HotelId,
        update: &DateRangeUpdate,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ExcursionRepository: Send + Sync {
    async fn search(&self, search: &TripSearch) -> Result<Vec<TripRecommendation>, RepositoryError>;
    async fn find_by_id(
        &self,
        id: RecommendationId,
    ) -> Result<Option<TripRecommendation>, RepositoryError>;
    async fn set_booked(&self, id: RecommendationId, booked: bool) -> Result<u64, RepositoryError>;
    async fn update_details(
        &self,
        id: RecommendationId,
        details: &str,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn list_sections(&self) -> Result<Vec<PolicySection>, RepositoryError>;
    async fn store_embedding(&self, id: i64, embedding: &[f32]) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>, RepositoryError>;
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), RepositoryError>;
    /// Returns whether a snapshot existed.
    async fn delete(&self, session_id: &SessionId) -> Result<bool, RepositoryError>;
}
