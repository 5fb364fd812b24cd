mod common;

use aerodesk_agent::{ApprovalResponse, TurnOutcome};
use aerodesk_core::domain::booking::RentalId;
use aerodesk_core::domain::conversation::Role;
use aerodesk_core::domain::session::SessionConfig;
use aerodesk_core::domain::tool::ToolId;
use aerodesk_core::errors::{ApplicationError, DomainError};
use aerodesk_core::flows::{AssistantId, GraphLayout, Skill};
use aerodesk_db::repositories::{CarRentalRepository, SqlCarRentalRepository};

use common::{runtime, seeded_pool, ScriptedModel, PASSENGER};

const DELEGATE_TO_CARS: &str = r#"{"THOUGHT": "car rental request", "ACTION": "ToBookCarRental",
    "ACTION_PARAMS": {"location": "Basel", "start_date": "2024-04-30", "end_date": "2024-05-04"}}"#;
const SEARCH_CARS: &str = r#"```json
{"THOUGHT": "find cars", "ACTION": "search_car_rentals_tool", "ACTION_PARAMS": {"location": "Basel"}}
```"#;
const BOOK_CAR: &str =
    r#"{"THOUGHT": "book Europcar", "ACTION": "book_car_rental_tool", "ACTION_PARAMS": {"rental_id": 1}}"#;
const ESCALATE: &str = r#"{"THOUGHT": "done here", "ACTION": "CompleteOrEscalate",
    "ACTION_PARAMS": {"cancel": false, "reason": "Car rental booking confirmed"}}"#;

fn passenger_session(id: &str) -> SessionConfig {
    SessionConfig::new(id).with_passenger(PASSENGER)
}

#[tokio::test]
async fn sensitive_booking_waits_for_approval_then_completes() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[DELEGATE_TO_CARS, SEARCH_CARS, BOOK_CAR]);
    let runtime = runtime(&pool, model.clone(), GraphLayout::Delegating, 20);
    let session = runtime.session(passenger_session("s-approve"));

    let outcome = session.ask("I need a car in Basel for my trip").await.expect("ask");
    let TurnOutcome::AwaitingApproval { owner, calls } = outcome else {
        panic!("expected an interrupt");
    };
    assert_eq!(owner, AssistantId::Skill(Skill::BookCarRental));
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool, ToolId::BookCarRental);
    assert_eq!(model.invocations(), 3);

    let rentals = SqlCarRentalRepository::new(pool.clone());
    assert!(!rentals.find_by_id(RentalId(1)).await.expect("find").expect("row").booked);

    let snapshot = session.snapshot().await.expect("load").expect("snapshot");
    assert!(snapshot.is_interrupted());
    assert_eq!(snapshot.state.dialog_stack.as_slice(), &[Skill::BookCarRental]);
    assert!(snapshot.state.user_info.as_deref().unwrap_or_default().contains("7240005432906569"));

    model.push(ESCALATE);
    model.push(r#"{"THOUGHT": "wrap up", "FINAL_ANSWER": "Your Europcar rental in Basel is booked."}"#);
    let outcome = session.resume(ApprovalResponse::Approve).await.expect("resume");
    assert_eq!(
        outcome,
        TurnOutcome::Answered { answer: "Your Europcar rental in Basel is booked.".to_string() }
    );
    assert!(rentals.find_by_id(RentalId(1)).await.expect("find").expect("row").booked);

    let snapshot = session.snapshot().await.expect("load").expect("snapshot");
    assert!(!snapshot.is_interrupted());
    assert!(snapshot.state.dialog_stack.is_empty());
    let tool_results: Vec<&str> = snapshot
        .state
        .messages
        .iter()
        .filter(|message| message.role == Role::Tool)
        .map(|message| message.content.as_str())
        .collect();
    assert!(tool_results[0].starts_with("The assistant is now the Car Rental Assistant."));
    assert!(tool_results.contains(&"Car rental 1 successfully booked."));
    assert!(tool_results.last().copied().unwrap_or_default().starts_with("Resuming dialog"));
}

#[tokio::test]
async fn denial_is_reported_to_the_model_and_storage_is_untouched() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[DELEGATE_TO_CARS, SEARCH_CARS, BOOK_CAR]);
    let runtime = runtime(&pool, model.clone(), GraphLayout::Delegating, 20);
    let session = runtime.session(passenger_session("s-deny"));

    let outcome = session.ask("I need a car in Basel").await.expect("ask");
    assert!(matches!(outcome, TurnOutcome::AwaitingApproval { .. }));

    model.push(r#"{"FINAL_ANSWER": "No problem, I did not book the car."}"#);
    let outcome = session
        .resume(ApprovalResponse::Deny { reason: "too expensive".to_string() })
        .await
        .expect("resume");
    assert_eq!(
        outcome,
        TurnOutcome::Answered { answer: "No problem, I did not book the car.".to_string() }
    );

    let rentals = SqlCarRentalRepository::new(pool);
    assert!(!rentals.find_by_id(RentalId(1)).await.expect("find").expect("row").booked);

    let transcript = model.last_transcript();
    assert!(transcript.iter().any(|message| message.content.contains(
        "API call denied by user. Reasoning: 'too expensive'. Continue assisting, accounting for the user's input."
    )));

    let snapshot = session.snapshot().await.expect("load").expect("snapshot");
    assert_eq!(snapshot.state.dialog_stack.as_slice(), &[Skill::BookCarRental]);
}

#[tokio::test]
async fn next_turn_goes_to_the_skill_on_top_of_the_stack() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[
        DELEGATE_TO_CARS,
        r#"{"FINAL_ANSWER": "Which dates do you need the car for?"}"#,
        r#"{"FINAL_ANSWER": "Noted, searching for those dates."}"#,
    ]);
    let runtime = runtime(&pool, model.clone(), GraphLayout::Delegating, 20);
    let session = runtime.session(passenger_session("s-stack"));

    session.ask("I need a car").await.expect("first turn");
    session.ask("from the 30th").await.expect("second turn");

    let system_prompt = model.last_transcript().first().map(|message| message.content.clone());
    assert!(system_prompt
        .unwrap_or_default()
        .starts_with("You are a specialized assistant for handling car rental bookings."));
}

#[tokio::test]
async fn missing_passenger_aborts_before_the_model_is_called() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[]);
    let runtime = runtime(&pool, model.clone(), GraphLayout::Delegating, 20);
    let session = runtime.session(SessionConfig::new("s-anon"));

    let error = session.ask("what time is my flight?").await.expect_err("no passenger");
    assert_eq!(error, ApplicationError::Domain(DomainError::MissingPassengerId));
    assert_eq!(model.invocations(), 0);
    assert!(session.snapshot().await.expect("load").is_none());
}

#[tokio::test]
async fn runaway_tool_loop_hits_the_step_budget() {
    let pool = seeded_pool().await;
    let search = r#"{"ACTION": "search_flights_tool", "ACTION_PARAMS": {"departure_airport": "CDG"}}"#;
    let model = ScriptedModel::new(&[search, search, search, search]);
    let runtime = runtime(&pool, model, GraphLayout::Flat, 3);
    let session = runtime.session(passenger_session("s-budget"));

    let error = session.ask("find me flights").await.expect_err("budget");
    assert_eq!(error, ApplicationError::StepBudgetExceeded { max_steps: 3 });
}

#[tokio::test]
async fn flat_layout_answers_directly() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[
        r#"{"ACTION": "fetch_user_flight_information_tool", "ACTION_PARAMS": {}}"#,
        r#"{"FINAL_ANSWER": "You are in seat 18E on LX0112."}"#,
    ]);
    let runtime = runtime(&pool, model.clone(), GraphLayout::Flat, 20);
    let session = runtime.session(passenger_session("s-flat"));

    let outcome = session.ask("where am I sitting?").await.expect("ask");
    assert_eq!(outcome, TurnOutcome::Answered { answer: "You are in seat 18E on LX0112.".to_string() });
    assert_eq!(model.invocations(), 2);
}

#[tokio::test]
async fn resume_and_reset_without_history() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[r#"{"FINAL_ANSWER": "Hello!"}"#]);
    let runtime = runtime(&pool, model, GraphLayout::Delegating, 20);
    let session = runtime.session(passenger_session("s-reset"));

    let error = session.resume(ApprovalResponse::Approve).await.expect_err("nothing pending");
    assert_eq!(error, ApplicationError::NothingToResume("s-reset".to_string()));

    session.ask("hi").await.expect("ask");
    assert!(session.reset().await.expect("reset"));
    assert!(!session.reset().await.expect("second reset"));
    assert!(session.snapshot().await.expect("load").is_none());
}

#[tokio::test]
async fn approved_calls_are_not_pending_again_after_a_later_failure() {
    let pool = seeded_pool().await;
    let model = ScriptedModel::new(&[DELEGATE_TO_CARS, SEARCH_CARS, BOOK_CAR]);
    let runtime = runtime(&pool, model.clone(), GraphLayout::Delegating, 20);
    let session = runtime.session(passenger_session("s-approve-then-garbage"));

    let outcome = session.ask("I need a car in Basel").await.expect("ask");
    assert!(matches!(outcome, TurnOutcome::AwaitingApproval { .. }));

    for _ in 0..3 {
        model.push("garbage");
    }
    let error = session.resume(ApprovalResponse::Approve).await.expect_err("model gives up");
    assert_eq!(error, ApplicationError::RetriesExhausted { attempts: 3 });

    let rentals = SqlCarRentalRepository::new(pool);
    assert!(rentals.find_by_id(RentalId(1)).await.expect("find").expect("row").booked);

    let snapshot = session.snapshot().await.expect("load").expect("snapshot");
    assert!(!snapshot.is_interrupted());
    assert!(snapshot.state.pending_tool_calls().is_empty());
    assert!(snapshot
        .state
        .messages
        .iter()
        .any(|message| message.content == "Car rental 1 successfully booked."));

    let error = session.resume(ApprovalResponse::Approve).await.expect_err("already approved");
    assert_eq!(error, ApplicationError::NothingToResume("s-approve-then-garbage".to_string()));
}
