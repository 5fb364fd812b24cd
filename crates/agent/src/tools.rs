//! Tool dispatch: a model-issued [`ToolCall`] is parsed into a typed
//! [`ToolRequest`], run against the repositories, and rendered as the text the
//! model reads back.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use aerodesk_core::domain::booking::{
    DateRangeUpdate, HotelId, RecommendationId, RentalId, StaySearch, TripSearch,
};
use aerodesk_core::domain::conversation::ToolCall;
use aerodesk_core::domain::flight::{FlightId, FlightSearch, PassengerId, TicketNo};
use aerodesk_core::domain::time::{format_timestamp, parse_date, parse_timestamp};
use aerodesk_core::domain::tool::ToolId;
use aerodesk_core::errors::{ApplicationError, DomainError};
use aerodesk_db::repositories::{
    CarRentalRepository, ExcursionRepository, FlightRepository, HotelRepository, RepositoryError,
};

use crate::policy::{render_sections, PolicyIndex};
use crate::search::WebSearch;

/// Minimum lead time between now and the departure of a flight a ticket is
/// moved to.
pub const MIN_RESCHEDULE_LEAD_HOURS: i64 = 3;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("{0}")]
    Integration(String),
}

impl From<ToolError> for ApplicationError {
    fn from(error: ToolError) -> Self {
        match error {
            ToolError::Domain(domain) => ApplicationError::Domain(domain),
            ToolError::Repository(repository) => repository.into(),
            ToolError::Integration(message) => ApplicationError::Integration(message),
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(error: anyhow::Error) -> Self {
        Self::Integration(format!("{error:#}"))
    }
}

fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(id) => Ok(id),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Deserialize)]
struct SearchFlightsArgs {
    departure_airport: Option<String>,
    arrival_airport: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct UpdateTicketArgs {
    ticket_no: String,
    #[serde(deserialize_with = "flexible_id")]
    new_flight_id: i64,
}

#[derive(Deserialize)]
struct TicketArgs {
    ticket_no: String,
}

#[derive(Deserialize)]
struct StaySearchArgs {
    location: Option<String>,
    name: Option<String>,
    price_tier: Option<String>,
    #[serde(alias = "checkin_date")]
    start_date: Option<String>,
    #[serde(alias = "checkout_date")]
    end_date: Option<String>,
}

#[derive(Deserialize)]
struct RentalArgs {
    #[serde(deserialize_with = "flexible_id")]
    rental_id: i64,
}

#[derive(Deserialize)]
struct UpdateRentalArgs {
    #[serde(deserialize_with = "flexible_id")]
    rental_id: i64,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
struct HotelArgs {
    #[serde(deserialize_with = "flexible_id")]
    hotel_id: i64,
}

#[derive(Deserialize)]
struct UpdateHotelArgs {
    #[serde(deserialize_with = "flexible_id")]
    hotel_id: i64,
    checkin_date: Option<String>,
    checkout_date: Option<String>,
}

#[derive(Deserialize)]
struct TripSearchArgs {
    location: Option<String>,
    name: Option<String>,
    keywords: Option<String>,
}

#[derive(Deserialize)]
struct RecommendationArgs {
    #[serde(deserialize_with = "flexible_id")]
    recommendation_id: i64,
}

#[derive(Deserialize)]
struct UpdateExcursionArgs {
    #[serde(deserialize_with = "flexible_id")]
    recommendation_id: i64,
    details: String,
}

/// An executable tool invocation with validated arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolRequest {
    WebSearch { query: String },
    LookupPolicy { query: String },
    FetchUserFlightInformation,
    SearchFlights(FlightSearch),
    UpdateTicketToNewFlight { ticket_no: TicketNo, new_flight_id: FlightId },
    CancelTicket { ticket_no: TicketNo },
    SearchCarRentals(StaySearch),
    BookCarRental(RentalId),
    UpdateCarRental(RentalId, DateRangeUpdate),
    CancelCarRental(RentalId),
    SearchHotels(StaySearch),
    BookHotel(HotelId),
    UpdateHotel(HotelId, DateRangeUpdate),
    CancelHotel(HotelId),
    SearchTripRecommendations(TripSearch),
    BookExcursion(RecommendationId),
    UpdateExcursion(RecommendationId, String),
    CancelExcursion(RecommendationId),
}

fn args<T: DeserializeOwned>(tool: ToolId, value: &Value) -> Result<T, DomainError> {
    let value = match value {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|error| DomainError::InvalidToolArguments {
        tool: tool.name().to_string(),
        message: error.to_string(),
    })
}

fn query_args(tool: ToolId, value: &Value) -> Result<String, DomainError> {
    match value {
        Value::String(query) => Ok(query.clone()),
        other => args::<QueryArgs>(tool, other).map(|parsed| parsed.query),
    }
}

fn optional_date(raw: Option<String>) -> Result<Option<chrono::NaiveDate>, DomainError> {
    raw.filter(|value| !value.trim().is_empty()).map(|value| parse_date(&value)).transpose()
}

fn optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>, DomainError> {
    raw.filter(|value| !value.trim().is_empty()).map(|value| parse_timestamp(&value)).transpose()
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn stay_search(parsed: StaySearchArgs) -> Result<StaySearch, DomainError> {
    Ok(StaySearch {
        location: non_empty(parsed.location),
        name: non_empty(parsed.name),
        price_tier: non_empty(parsed.price_tier),
        start_date: optional_date(parsed.start_date)?,
        end_date: optional_date(parsed.end_date)?,
    })
}

impl ToolRequest {
    pub fn parse(call: &ToolCall) -> Result<Self, DomainError> {
        let tool = call.tool;
        let raw = &call.args;

        let request = match tool {
            ToolId::WebSearch => Self::WebSearch { query: query_args(tool, raw)? },
            ToolId::LookupPolicy => Self::LookupPolicy { query: query_args(tool, raw)? },
            ToolId::FetchUserFlightInformation => Self::FetchUserFlightInformation,
            ToolId::SearchFlights => {
                let parsed: SearchFlightsArgs = args(tool, raw)?;
                Self::SearchFlights(FlightSearch {
                    departure_airport: non_empty(parsed.departure_airport),
                    arrival_airport: non_empty(parsed.arrival_airport),
                    start_time: optional_timestamp(parsed.start_time)?,
                    end_time: optional_timestamp(parsed.end_time)?,
                    limit: parsed.limit.unwrap_or(FlightSearch::DEFAULT_LIMIT),
                })
            }
            ToolId::UpdateTicketToNewFlight => {
                let parsed: UpdateTicketArgs = args(tool, raw)?;
                Self::UpdateTicketToNewFlight {
                    ticket_no: TicketNo(parsed.ticket_no.trim().to_string()),
                    new_flight_id: FlightId(parsed.new_flight_id),
                }
            }
            ToolId::CancelTicket => {
                let parsed: TicketArgs = args(tool, raw)?;
                Self::CancelTicket { ticket_no: TicketNo(parsed.ticket_no.trim().to_string()) }
            }
            ToolId::SearchCarRentals => Self::SearchCarRentals(stay_search(args(tool, raw)?)?),
            ToolId::BookCarRental => {
                Self::BookCarRental(RentalId(args::<RentalArgs>(tool, raw)?.rental_id))
            }
            ToolId::UpdateCarRental => {
                let parsed: UpdateRentalArgs = args(tool, raw)?;
                Self::UpdateCarRental(
                    RentalId(parsed.rental_id),
                    DateRangeUpdate {
                        start_date: optional_date(parsed.start_date)?,
                        end_date: optional_date(parsed.end_date)?,
                    },
                )
            }
            ToolId::CancelCarRental => {
                Self::CancelCarRental(RentalId(args::<RentalArgs>(tool, raw)?.rental_id))
            }
            ToolId::SearchHotels => Self::SearchHotels(stay_search(args(tool, raw)?)?),
            ToolId::BookHotel => Self::BookHotel(HotelId(args::<HotelArgs>(tool, raw)?.hotel_id)),
            ToolId::UpdateHotel => {
                let parsed: UpdateHotelArgs = args(tool, raw)?;
                Self::UpdateHotel(
                    HotelId(parsed.hotel_id),
                    DateRangeUpdate {
                        start_date: optional_date(parsed.checkin_date)?,
                        end_date: optional_date(parsed.checkout_date)?,
                    },
                )
            }
            ToolId::CancelHotel => {
                Self::CancelHotel(HotelId(args::<HotelArgs>(tool, raw)?.hotel_id))
            }
            ToolId::SearchTripRecommendations => {
                let parsed: TripSearchArgs = args(tool, raw)?;
                let search = TripSearch {
                    location: non_empty(parsed.location),
                    name: non_empty(parsed.name),
                    ..TripSearch::default()
                };
                Self::SearchTripRecommendations(match parsed.keywords {
                    Some(keywords) => search.with_keyword_list(&keywords),
                    None => search,
                })
            }
            ToolId::BookExcursion => Self::BookExcursion(RecommendationId(
                args::<RecommendationArgs>(tool, raw)?.recommendation_id,
            )),
            ToolId::UpdateExcursion => {
                let parsed: UpdateExcursionArgs = args(tool, raw)?;
                Self::UpdateExcursion(RecommendationId(parsed.recommendation_id), parsed.details)
            }
            ToolId::CancelExcursion => Self::CancelExcursion(RecommendationId(
                args::<RecommendationArgs>(tool, raw)?.recommendation_id,
            )),
            ToolId::CompleteOrEscalate
            | ToolId::ToFlightBookingAssistant
            | ToolId::ToBookCarRental
            | ToolId::ToHotelBookingAssistant
            | ToolId::ToBookExcursion => {
                return Err(DomainError::InvalidToolArguments {
                    tool: tool.name().to_string(),
                    message: "routing signals are handled by the dialog graph".to_string(),
                })
            }
        };
        Ok(request)
    }
}

/// Per-call context the tools read identity and the clock from.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub passenger_id: Option<PassengerId>,
    pub now: DateTime<Utc>,
}

impl ToolContext {
    fn passenger(&self) -> Result<&PassengerId, DomainError> {
        self.passenger_id.as_ref().ok_or(DomainError::MissingPassengerId)
    }
}

pub struct ToolExecutor {
    flights: Arc<dyn FlightRepository>,
    car_rentals: Arc<dyn CarRentalRepository>,
    hotels: Arc<dyn HotelRepository>,
    excursions: Arc<dyn ExcursionRepository>,
    policy: PolicyIndex,
    search: Arc<dyn WebSearch>,
}

impl ToolExecutor {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        car_rentals: Arc<dyn CarRentalRepository>,
        hotels: Arc<dyn HotelRepository>,
        excursions: Arc<dyn ExcursionRepository>,
        policy: PolicyIndex,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self { flights, car_rentals, hotels, excursions, policy, search }
    }

    /// Runs the call and reports failures back to the model as text instead
    /// of aborting the turn.
    pub async fn execute_or_report(&self, call: &ToolCall, context: &ToolContext) -> String {
        match self.execute(call, context).await {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    event_name = "tool.failed",
                    tool = call.tool.name(),
                    tool_call_id = %call.id,
                    error = %error,
                    "tool call failed"
                );
                format!("Error: {error}\n please fix your mistakes.")
            }
        }
    }

    pub async fn execute(&self, call: &ToolCall, context: &ToolContext) -> Result<String, ToolError> {
        let request = ToolRequest::parse(call)?;
        let output = self.run(request, context).await?;
        info!(
            event_name = "tool.executed",
            tool = call.tool.name(),
            tool_call_id = %call.id,
            output_len = output.len(),
            "tool call executed"
        );
        Ok(output)
    }

    pub async fn fetch_user_flight_information(
        &self,
        context: &ToolContext,
    ) -> Result<String, ToolError> {
        let passenger_id = context.passenger()?;
        let flights = self.flights.passenger_flights(passenger_id).await?;
        rows_to_text(&flights)
    }

    async fn run(&self, request: ToolRequest, context: &ToolContext) -> Result<String, ToolError> {
        match request {
            ToolRequest::WebSearch { query } => {
                let hits = self.search.search(&query).await?;
                rows_to_text(&hits)
            }
            ToolRequest::LookupPolicy { query } => {
                let sections = self.policy.lookup(&query).await?;
                Ok(render_sections(&sections))
            }
            ToolRequest::FetchUserFlightInformation => {
                self.fetch_user_flight_information(context).await
            }
            ToolRequest::SearchFlights(search) => {
                let flights = self.flights.search(&search).await?;
                rows_to_text(&flights)
            }
            ToolRequest::UpdateTicketToNewFlight { ticket_no, new_flight_id } => {
                self.update_ticket(context, &ticket_no, new_flight_id).await
            }
            ToolRequest::CancelTicket { ticket_no } => self.cancel_ticket(context, &ticket_no).await,
            ToolRequest::SearchCarRentals(search) => {
                rows_to_text(&self.car_rentals.search(&search).await?)
            }
            ToolRequest::BookCarRental(id) => {
                let touched = self.car_rentals.set_booked(id, true).await?;
                Ok(rental_message(id, touched, "booked"))
            }
            ToolRequest::UpdateCarRental(id, update) => {
                if update.is_empty() {
                    return Ok(format!("No changes requested for car rental {}.", id.0));
                }
                let touched = self.car_rentals.update_dates(id, &update).await?;
                Ok(rental_message(id, touched, "updated"))
            }
            ToolRequest::CancelCarRental(id) => {
                let touched = self.car_rentals.set_booked(id, false).await?;
                Ok(rental_message(id, touched, "cancelled"))
            }
            ToolRequest::SearchHotels(search) => rows_to_text(&self.hotels.search(&search).await?),
            ToolRequest::BookHotel(id) => {
                let touched = self.hotels.set_booked(id, true).await?;
                Ok(hotel_message(id, touched, "booked"))
            }
            ToolRequest::UpdateHotel(id, update) => {
                if update.is_empty() {
                    return Ok(format!("No changes requested for hotel {}.", id.0));
                }
                let touched = self.hotels.update_dates(id, &update).await?;
                Ok(hotel_message(id, touched, "updated"))
            }
            ToolRequest::CancelHotel(id) => {
                let touched = self.hotels.set_booked(id, false).await?;
                Ok(hotel_message(id, touched, "cancelled"))
            }
            ToolRequest::SearchTripRecommendations(search) => {
                rows_to_text(&self.excursions.search(&search).await?)
            }
            ToolRequest::BookExcursion(id) => {
                let touched = self.excursions.set_booked(id, true).await?;
                Ok(trip_message(id, touched, "booked"))
            }
            ToolRequest::UpdateExcursion(id, details) => {
                let touched = self.excursions.update_details(id, &details).await?;
                Ok(trip_message(id, touched, "updated"))
            }
            ToolRequest::CancelExcursion(id) => {
                let touched = self.excursions.set_booked(id, false).await?;
                Ok(trip_message(id, touched, "cancelled"))
            }
        }
    }

    async fn update_ticket(
        &self,
        context: &ToolContext,
        ticket_no: &TicketNo,
        new_flight_id: FlightId,
    ) -> Result<String, ToolError> {
        let passenger_id = context.passenger()?;

        let Some(new_flight) = self.flights.find_flight(new_flight_id).await? else {
            return Ok("Invalid new flight ID provided.".to_string());
        };
        if new_flight.scheduled_departure - context.now < Duration::hours(MIN_RESCHEDULE_LEAD_HOURS)
        {
            return Ok(format!(
                "Not permitted to reschedule to a flight that is less than 3 hours from the current time. \
                 Selected flight is at {}.",
                format_timestamp(&new_flight.scheduled_departure)
            ));
        }

        let Some(segment) = self.flights.find_ticket_segment(ticket_no).await? else {
            return Ok("No existing ticket found for the given ticket number.".to_string());
        };
        if &segment.passenger_id != passenger_id {
            return Ok(format!(
                "Current signed-in passenger with ID {} not the owner of ticket {}",
                passenger_id.0, ticket_no.0
            ));
        }

        self.flights.reassign_ticket(ticket_no, new_flight_id).await?;
        Ok("Ticket successfully updated to new flight.".to_string())
    }

    async fn cancel_ticket(
        &self,
        context: &ToolContext,
        ticket_no: &TicketNo,
    ) -> Result<String, ToolError> {
        let passenger_id = context.passenger()?;

        let Some(segment) = self.flights.find_ticket_segment(ticket_no).await? else {
            return Ok("No existing ticket found for the given ticket number.".to_string());
        };
        if &segment.passenger_id != passenger_id {
            return Ok(format!(
                "Current signed-in passenger with ID {} not the owner of ticket {}",
                passenger_id.0, ticket_no.0
            ));
        }

        self.flights.remove_ticket_segment(ticket_no).await?;
        Ok("Ticket successfully cancelled.".to_string())
    }
}

/// Search results as a JSON array; no rows renders as empty text so the
/// assistant loop can nudge the model to widen its parameters.
fn rows_to_text<T: serde::Serialize>(rows: &[T]) -> Result<String, ToolError> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    serde_json::to_string(rows).map_err(|error| ToolError::Integration(error.to_string()))
}

fn rental_message(id: RentalId, touched: u64, verb: &str) -> String {
    if touched > 0 {
        format!("Car rental {} successfully {verb}.", id.0)
    } else {
        format!("No car rental found with ID {}.", id.0)
    }
}

fn hotel_message(id: HotelId, touched: u64, verb: &str) -> String {
    if touched > 0 {
        format!("Hotel {} successfully {verb}.", id.0)
    } else {
        format!("No hotel found with ID {}.", id.0)
    }
}

fn trip_message(id: RecommendationId, touched: u64, verb: &str) -> String {
    if touched > 0 {
        format!("Trip recommendation {} successfully {verb}.", id.0)
    } else {
        format!("No trip recommendation found with ID {}.", id.0)
    }
}
