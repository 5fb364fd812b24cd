//! Closed catalog of every tool the assistants can request.
//!
//! The model addresses tools by their wire name (`search_hotels_tool`, ...).
//! `ToolId::from_name` is the only way a model-provided string becomes a tool,
//! so anything outside this catalog is rejected before routing.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolId {
    #[serde(rename = "tavily_search_results_json")]
    WebSearch,
    #[serde(rename = "lookup_policy_tool")]
    LookupPolicy,
    #[serde(rename = "fetch_user_flight_information_tool")]
    FetchUserFlightInformation,
    #[serde(rename = "search_flights_tool")]
    SearchFlights,
    #[serde(rename = "update_ticket_to_new_flight_tool")]
    UpdateTicketToNewFlight,
    #[serde(rename = "cancel_ticket_tool")]
    CancelTicket,
    #[serde(rename = "search_car_rentals_tool")]
    SearchCarRentals,
    #[serde(rename = "book_car_rental_tool")]
    BookCarRental,
    #[serde(rename = "update_car_rental_tool")]
    UpdateCarRental,
    #[serde(rename = "cancel_car_rental_tool")]
    CancelCarRental,
    #[serde(rename = "search_hotels_tool")]
    SearchHotels,
    #[serde(rename = "book_hotel_tool")]
    BookHotel,
    #[serde(rename = "update_hotel_tool")]
    UpdateHotel,
    #[serde(rename = "cancel_hotel_tool")]
    CancelHotel,
    #[serde(rename = "search_trip_recommendations_tool")]
    SearchTripRecommendations,
    #[serde(rename = "book_excursion_tool")]
    BookExcursion,
    #[serde(rename = "update_excursion_tool")]
    UpdateExcursion,
    #[serde(rename = "cancel_excursion_tool")]
    CancelExcursion,
    #[serde(rename = "CompleteOrEscalate")]
    CompleteOrEscalate,
    #[serde(rename = "ToFlightBookingAssistant")]
    ToFlightBookingAssistant,
    #[serde(rename = "ToBookCarRental")]
    ToBookCarRental,
    #[serde(rename = "ToHotelBookingAssistant")]
    ToHotelBookingAssistant,
    #[serde(rename = "ToBookExcursion")]
    ToBookExcursion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Read-only; runs without approval.
    Safe,
    /// Mutates booking state; gated behind approval.
    Sensitive,
    /// Routing signal consumed by the dialog graph, never executed.
    Control,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolDescriptor {
    /// Renders the block listed under `{tool_descs}` in the system prompt.
    pub fn render(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|param| format!("{}: {} ({})", param.name, param.ty, param.description))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "tool_name -> {}\ntool_params -> {}\ntool_description ->\n{}",
            self.name, params, self.description
        )
    }
}

macro_rules! param {
    ($name:literal, $ty:literal, $description:literal $(,)?) => {
        ParamSpec { name: $name, ty: $ty, description: $description }
    };
}

const STAY_SEARCH_PARAMS: [ParamSpec; 5] = [
    param!("location", "Optional[str]", "The location to search in."),
    param!("name", "Optional[str]", "The name or part of the name to match."),
    param!("price_tier", "Optional[str]", "Midscale, Upper Midscale, Upscale or Luxury."),
    param!("start_date", "Optional[date]", "The first day of the stay or rental."),
    param!("end_date", "Optional[date]", "The last day of the stay or rental."),
];

impl ToolId {
    pub const ALL: [ToolId; 23] = [
        ToolId::WebSearch,
        ToolId::LookupPolicy,
        ToolId::FetchUserFlightInformation,
        ToolId::SearchFlights,
        ToolId::UpdateTicketToNewFlight,
        ToolId::CancelTicket,
        ToolId::SearchCarRentals,
        ToolId::BookCarRental,
        ToolId::UpdateCarRental,
        ToolId::CancelCarRental,
        ToolId::SearchHotels,
        ToolId::BookHotel,
        ToolId::UpdateHotel,
        ToolId::CancelHotel,
        ToolId::SearchTripRecommendations,
        ToolId::BookExcursion,
        ToolId::UpdateExcursion,
        ToolId::CancelExcursion,
        ToolId::CompleteOrEscalate,
        ToolId::ToFlightBookingAssistant,
        ToolId::ToBookCarRental,
        ToolId::ToHotelBookingAssistant,
        ToolId::ToBookExcursion,
    ];

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn kind(self) -> ToolKind {
        match self {
            Self::WebSearch
            | Self::LookupPolicy
            | Self::FetchUserFlightInformation
            | Self::SearchFlights
            | Self::SearchCarRentals
            | Self::SearchHotels
            | Self::SearchTripRecommendations => ToolKind::Safe,
            Self::UpdateTicketToNewFlight
            | Self::CancelTicket
            | Self::BookCarRental
            | Self::UpdateCarRental
            | Self::CancelCarRental
            | Self::BookHotel
            | Self::UpdateHotel
            | Self::CancelHotel
            | Self::BookExcursion
            | Self::UpdateExcursion
            | Self::CancelExcursion => ToolKind::Sensitive,
            Self::CompleteOrEscalate
            | Self::ToFlightBookingAssistant
            | Self::ToBookCarRental
            | Self::ToHotelBookingAssistant
            | Self::ToBookExcursion => ToolKind::Control,
        }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        let (name, description, params): (&'static str, &'static str, &'static [ParamSpec]) =
            match self {
                Self::WebSearch => (
                    "tavily_search_results_json",
                    "A search engine for current events and general questions. Input should be a search query.",
                    &[param!("query", "str", "The search query.")],
                ),
                Self::LookupPolicy => (
                    "lookup_policy_tool",
                    "Consult the company policies to check whether certain options are permitted. \
                     Use this before making any flight changes or performing other 'write' events.",
                    &[param!("query", "str", "What to look up in the policy documents.")],
                ),
                Self::FetchUserFlightInformation => (
                    "fetch_user_flight_information_tool",
                    "Fetch all tickets for the signed-in passenger along with flight and seat information.",
                    &[],
                ),
                Self::SearchFlights => (
                    "search_flights_tool",
                    "Search for flights based on departure airport, arrival airport and a departure time range.",
                    &[
                        param!("departure_airport", "Optional[str]", "IATA code of the departure airport."),
                        param!("arrival_airport", "Optional[str]", "IATA code of the arrival airport."),
                        param!("start_time", "Optional[datetime]", "Earliest scheduled departure."),
                        param!("end_time", "Optional[datetime]", "Latest scheduled departure."),
                        param!("limit", "int", "Maximum number of flights to return. Defaults to 20."),
                    ],
                ),
                Self::UpdateTicketToNewFlight => (
                    "update_ticket_to_new_flight_tool",
                    "Move the passenger's ticket to a new flight. The new flight must depart at least 3 hours from now.",
                    &[
                        param!("ticket_no", "str", "The ticket number to move."),
                        param!("new_flight_id", "int", "The id of the new flight."),
                    ],
                ),
                Self::CancelTicket => (
                    "cancel_ticket_tool",
                    "Cancel the passenger's ticket and remove it from the database.",
                    &[param!("ticket_no", "str", "The ticket number to cancel.")],
                ),
                Self::SearchCarRentals => (
                    "search_car_rentals_tool",
                    "Search for car rentals based on location, company name, price tier, start date and end date.",
                    &STAY_SEARCH_PARAMS,
                ),
                Self::BookCarRental => (
                    "book_car_rental_tool",
                    "Book a car rental by its ID.",
                    &[param!("rental_id", "int", "The ID of the car rental to book.")],
                ),
                Self::UpdateCarRental => (
                    "update_car_rental_tool",
                    "Update a car rental's start and end dates by its ID.",
                    &[
                        param!("rental_id", "int", "The ID of the car rental to update."),
                        param!("start_date", "Optional[date]", "The new start date of the car rental."),
                        param!("end_date", "Optional[date]", "The new end date of the car rental."),
                    ],
                ),
                Self::CancelCarRental => (
                    "cancel_car_rental_tool",
                    "Cancel a car rental by its ID.",
                    &[param!("rental_id", "int", "The ID of the car rental to cancel.")],
                ),
                Self::SearchHotels => (
                    "search_hotels_tool",
                    "Search for hotels based on location, name, price tier, check-in date and check-out date.",
                    &STAY_SEARCH_PARAMS,
                ),
                Self::BookHotel => (
                    "book_hotel_tool",
                    "Book a hotel by its ID.",
                    &[param!("hotel_id", "int", "The ID of the hotel to book.")],
                ),
                Self::UpdateHotel => (
                    "update_hotel_tool",
                    "Update a hotel's check-in and check-out dates by its ID.",
                    &[
                        param!("hotel_id", "int", "The ID of the hotel to update."),
                        param!("checkin_date", "Optional[date]", "The new check-in date."),
                        param!("checkout_date", "Optional[date]", "The new check-out date."),
                    ],
                ),
                Self::CancelHotel => (
                    "cancel_hotel_tool",
                    "Cancel a hotel by its ID.",
                    &[param!("hotel_id", "int", "The ID of the hotel to cancel.")],
                ),
                Self::SearchTripRecommendations => (
                    "search_trip_recommendations_tool",
                    "Search for trip recommendations based on location, name and comma-separated keywords.",
                    &[
                        param!("location", "Optional[str]", "The location of the trip recommendation."),
                        param!("name", "Optional[str]", "The name of the trip recommendation."),
                        param!("keywords", "Optional[str]", "Comma-separated keywords, any of which may match."),
                    ],
                ),
                Self::BookExcursion => (
                    "book_excursion_tool",
                    "Book an excursion by its recommendation ID.",
                    &[param!("recommendation_id", "int", "The ID of the trip recommendation to book.")],
                ),
                Self::UpdateExcursion => (
                    "update_excursion_tool",
                    "Update a trip recommendation's details by its ID.",
                    &[
                        param!("recommendation_id", "int", "The ID of the trip recommendation to update."),
                        param!("details", "str", "The new details of the trip recommendation."),
                    ],
                ),
                Self::CancelExcursion => (
                    "cancel_excursion_tool",
                    "Cancel a trip recommendation by its ID.",
                    &[param!("recommendation_id", "int", "The ID of the trip recommendation to cancel.")],
                ),
                Self::CompleteOrEscalate => (
                    "CompleteOrEscalate",
                    "Mark the current task as completed and/or escalate control of the dialog to the main \
                     assistant, who can re-route the dialog based on the user's needs.",
                    &[
                        param!("cancel", "bool", "Whether the current task is abandoned. Defaults to true."),
                        param!("reason", "str", "Why the dialog is handed back."),
                    ],
                ),
                Self::ToFlightBookingAssistant => (
                    "ToFlightBookingAssistant",
                    "Transfers work to a specialized assistant to handle flight updates, cancellations and flight search.",
                    &[param!(
                        "request",
                        "str",
                        "Any necessary followup questions the update flight assistant should clarify before proceeding.",
                    )],
                ),
                Self::ToBookCarRental => (
                    "ToBookCarRental",
                    "Transfers work to a specialized assistant to handle car rental bookings.",
                    &[
                        param!("location", "str", "The location where the user wants to rent a car."),
                        param!("start_date", "str", "The start date of the car rental."),
                        param!("end_date", "str", "The end date of the car rental."),
                        param!("request", "str", "Any additional information or requests from the user."),
                    ],
                ),
                Self::ToHotelBookingAssistant => (
                    "ToHotelBookingAssistant",
                    "Transfers work to a specialized assistant to handle hotel bookings.",
                    &[
                        param!("location", "str", "The location where the user wants to book a hotel."),
                        param!("checkin_date", "str", "The check-in date for the hotel."),
                        param!("checkout_date", "str", "The check-out date for the hotel."),
                        param!("request", "str", "Any additional information or requests from the user."),
                    ],
                ),
                Self::ToBookExcursion => (
                    "ToBookExcursion",
                    "Transfers work to a specialized assistant to handle trip recommendations and other excursion bookings.",
                    &[
                        param!("location", "str", "The location where the user wants to book a recommended trip."),
                        param!("request", "str", "Any additional information or requests from the user."),
                    ],
                ),
            };

        ToolDescriptor { id: self, name, description, params }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
