mod common;

use chrono::Utc;
use serde_json::{json, Value};

use aerodesk_agent::tools::{ToolContext, ToolError};
use aerodesk_core::domain::booking::{HotelId, RecommendationId, RentalId};
use aerodesk_core::domain::conversation::ToolCall;
use aerodesk_core::domain::flight::{FlightId, PassengerId};
use aerodesk_core::domain::tool::ToolId;
use aerodesk_core::errors::DomainError;
use aerodesk_db::repositories::{
    CarRentalRepository, ExcursionRepository, FlightRepository, HotelRepository,
    SqlCarRentalRepository, SqlExcursionRepository, SqlFlightRepository, SqlHotelRepository,
};
use aerodesk_db::DbPool;

use common::{executor, seeded_pool, OTHER_PASSENGER, PASSENGER};

fn signed_in(passenger: &str) -> ToolContext {
    ToolContext { passenger_id: Some(PassengerId(passenger.to_string())), now: Utc::now() }
}

fn anonymous() -> ToolContext {
    ToolContext { passenger_id: None, now: Utc::now() }
}

fn call(tool: ToolId, args: Value) -> ToolCall {
    ToolCall::new(tool, args)
}

#[tokio::test]
async fn ticket_moves_to_a_later_flight() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);

    let output = tools
        .execute(
            &call(
                ToolId::UpdateTicketToNewFlight,
                json!({"ticket_no": "7240005432906569", "new_flight_id": 19251}),
            ),
            &signed_in(PASSENGER),
        )
        .await
        .expect("update ticket");
    assert_eq!(output, "Ticket successfully updated to new flight.");

    let flights = SqlFlightRepository::new(pool)
        .passenger_flights(&PassengerId(PASSENGER.to_string()))
        .await
        .expect("passenger flights");
    assert!(flights.iter().any(|row| row.flight_id == FlightId(19251)));
    assert!(!flights.iter().any(|row| row.flight_id == FlightId(19250)));
}

#[tokio::test]
async fn ticket_changes_enforce_lead_time_existence_and_ownership() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);
    let context = signed_in(PASSENGER);

    let too_soon = tools
        .execute(
            &call(
                ToolId::UpdateTicketToNewFlight,
                json!({"ticket_no": "7240005432906569", "new_flight_id": 19253}),
            ),
            &context,
        )
        .await
        .expect("tool ran");
    assert!(too_soon.starts_with(
        "Not permitted to reschedule to a flight that is less than 3 hours from the current time."
    ));

    let unknown_flight = tools
        .execute(
            &call(
                ToolId::UpdateTicketToNewFlight,
                json!({"ticket_no": "7240005432906569", "new_flight_id": 99999}),
            ),
            &context,
        )
        .await
        .expect("tool ran");
    assert_eq!(unknown_flight, "Invalid new flight ID provided.");

    let foreign = tools
        .execute(&call(ToolId::CancelTicket, json!({"ticket_no": "0005432661915"})), &context)
        .await
        .expect("tool ran");
    assert_eq!(
        foreign,
        "Current signed-in passenger with ID 3442 587242 not the owner of ticket 0005432661915"
    );

    let missing = tools
        .execute(&call(ToolId::CancelTicket, json!({"ticket_no": "0000000000000"})), &context)
        .await
        .expect("tool ran");
    assert_eq!(missing, "No existing ticket found for the given ticket number.");
}

#[tokio::test]
async fn owner_can_cancel_their_ticket() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);

    let output = tools
        .execute(
            &call(ToolId::CancelTicket, json!({"ticket_no": "0005432661915"})),
            &signed_in(OTHER_PASSENGER),
        )
        .await
        .expect("cancel");
    assert_eq!(output, "Ticket successfully cancelled.");

    let remaining = SqlFlightRepository::new(pool)
        .passenger_flights(&PassengerId(OTHER_PASSENGER.to_string()))
        .await
        .expect("passenger flights");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn flight_tools_need_a_signed_in_passenger() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);
    let fetch = call(ToolId::FetchUserFlightInformation, json!({}));

    let error = tools.execute(&fetch, &anonymous()).await.expect_err("no passenger");
    assert!(matches!(error, ToolError::Domain(DomainError::MissingPassengerId)));

    let reported = tools.execute_or_report(&fetch, &anonymous()).await;
    assert_eq!(
        reported,
        "Error: no passenger id configured for this session\n please fix your mistakes."
    );

    let searched = tools
        .execute(
            &call(ToolId::SearchFlights, json!({"departure_airport": "CDG", "arrival_airport": "BSL"})),
            &anonymous(),
        )
        .await
        .expect("search needs no passenger");
    let rows: Vec<Value> = serde_json::from_str(&searched).expect("json rows");
    assert_eq!(rows.len(), 5);
}

#[tokio::test]
async fn booking_and_cancelling_a_car_rental_flip_the_flag() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);
    let rentals = SqlCarRentalRepository::new(pool.clone());
    let context = anonymous();

    let booked = tools
        .execute(&call(ToolId::BookCarRental, json!({"rental_id": 1})), &context)
        .await
        .expect("book");
    assert_eq!(booked, "Car rental 1 successfully booked.");
    assert!(rentals.find_by_id(RentalId(1)).await.expect("find").expect("row").booked);

    let cancelled = tools
        .execute(&call(ToolId::CancelCarRental, json!({"rental_id": "1"})), &context)
        .await
        .expect("cancel");
    assert_eq!(cancelled, "Car rental 1 successfully cancelled.");
    assert!(!rentals.find_by_id(RentalId(1)).await.expect("find").expect("row").booked);
}

/// `booked` flag of every seeded rental, hotel and excursion, by id.
async fn booked_flags(pool: &DbPool) -> Vec<(&'static str, i64, bool)> {
    let rentals = SqlCarRentalRepository::new(pool.clone());
    let hotels = SqlHotelRepository::new(pool.clone());
    let excursions = SqlExcursionRepository::new(pool.clone());
    let mut flags = Vec::new();
    for id in 1..=12 {
        if let Some(rental) = rentals.find_by_id(RentalId(id)).await.expect("rental") {
            flags.push(("car_rentals", id, rental.booked));
        }
        if let Some(hotel) = hotels.find_by_id(HotelId(id)).await.expect("hotel") {
            flags.push(("hotels", id, hotel.booked));
        }
        if let Some(trip) = excursions.find_by_id(RecommendationId(id)).await.expect("trip") {
            flags.push(("trip_recommendations", id, trip.booked));
        }
    }
    flags
}

#[tokio::test]
async fn booking_a_missing_id_reports_not_found_and_changes_nothing() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);
    let before = booked_flags(&pool).await;
    assert_eq!(before.len(), 8 + 10 + 10);

    let cases = [
        (ToolId::BookCarRental, json!({"rental_id": 404}), "No car rental found with ID 404."),
        (ToolId::BookHotel, json!({"hotel_id": 404}), "No hotel found with ID 404."),
        (
            ToolId::BookExcursion,
            json!({"recommendation_id": 404}),
            "No trip recommendation found with ID 404.",
        ),
    ];
    for (tool, args, expected) in cases {
        let output = tools.execute(&call(tool, args), &anonymous()).await.expect("book missing");
        assert_eq!(output, expected);
    }

    assert_eq!(booked_flags(&pool).await, before);
}

#[tokio::test]
async fn hotel_updates_require_a_change() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);
    let context = anonymous();

    let nothing = tools
        .execute(&call(ToolId::UpdateHotel, json!({"hotel_id": 1})), &context)
        .await
        .expect("empty update");
    assert_eq!(nothing, "No changes requested for hotel 1.");

    let moved = tools
        .execute(
            &call(ToolId::UpdateHotel, json!({"hotel_id": 1, "checkout_date": "2031-01-10"})),
            &context,
        )
        .await
        .expect("update");
    assert_eq!(moved, "Hotel 1 successfully updated.");

    let hotel = SqlHotelRepository::new(pool)
        .find_by_id(HotelId(1))
        .await
        .expect("find")
        .expect("row");
    assert_eq!(hotel.checkout_date.to_string(), "2031-01-10");
}

#[tokio::test]
async fn empty_search_renders_as_empty_text() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);

    let none = tools
        .execute(&call(ToolId::SearchHotels, json!({"location": "Atlantis"})), &anonymous())
        .await
        .expect("search");
    assert_eq!(none, "");

    let basel = tools
        .execute(&call(ToolId::SearchHotels, json!({"location": "basel"})), &anonymous())
        .await
        .expect("search");
    let rows: Vec<Value> = serde_json::from_str(&basel).expect("json rows");
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn excursions_match_any_keyword() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);

    let output = tools
        .execute(
            &call(
                ToolId::SearchTripRecommendations,
                json!({"location": "Lucerne", "keywords": "museum, mountain"}),
            ),
            &anonymous(),
        )
        .await
        .expect("search");
    let ids: Vec<i64> = serde_json::from_str::<Vec<Value>>(&output)
        .expect("json rows")
        .iter()
        .filter_map(|row| row["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![5, 6]);

    let booked = tools
        .execute(&call(ToolId::BookExcursion, json!({"recommendation_id": 5})), &anonymous())
        .await
        .expect("book");
    assert_eq!(booked, "Trip recommendation 5 successfully booked.");
}

#[tokio::test]
async fn policy_lookup_returns_the_closest_sections() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);

    let output = tools
        .execute(&call(ToolId::LookupPolicy, json!({"query": "Can I rebook my flight?"})), &anonymous())
        .await
        .expect("lookup");
    assert!(output.starts_with("## Changing flights"));
    assert_eq!(output.matches("## ").count(), 2);
}

#[tokio::test]
async fn web_search_accepts_a_bare_query() {
    let pool = seeded_pool().await;
    let tools = executor(&pool);

    let output = tools
        .execute(&call(ToolId::WebSearch, json!("weather in Basel")), &anonymous())
        .await
        .expect("search");
    assert!(output.contains("results for weather in Basel"));
}
