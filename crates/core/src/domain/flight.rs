use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketNo(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassengerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub flight_id: FlightId,
    pub flight_no: String,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: DateTime<Utc>,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub status: String,
    pub aircraft_code: String,
    pub actual_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
}

/// A ticket joined with the flight segment it currently holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSegment {
    pub ticket_no: TicketNo,
    pub passenger_id: PassengerId,
    pub flight_id: FlightId,
}

/// One flight segment held by a passenger, joined with seat and fare.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerFlight {
    pub ticket_no: TicketNo,
    pub book_ref: String,
    pub flight_id: FlightId,
    pub flight_no: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: DateTime<Utc>,
    pub seat_no: Option<String>,
    pub fare_conditions: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlightSearch {
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: u32,
}

impl FlightSearch {
    pub const DEFAULT_LIMIT: u32 = 20;
}

impl Default for FlightSearch {
    fn default() -> Self {
        Self {
            departure_airport: None,
            arrival_airport: None,
            start_time: None,
            end_time: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
