pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use domain::booking::{
    CarRental, DateRangeUpdate, Hotel, HotelId, RecommendationId, RentalId, StaySearch,
    TripRecommendation, TripSearch,
};
pub use domain::conversation::{ConversationState, Message, Role, ToolCall};
pub use domain::flight::{
    Flight, FlightId, FlightSearch, PassengerFlight, PassengerId, TicketNo, TicketSegment,
};
pub use domain::policy::PolicySection;
pub use domain::session::{SessionConfig, SessionId, SessionSnapshot};
pub use domain::tool::{ToolDescriptor, ToolId, ToolKind};
pub use errors::{ApplicationError, DomainError};
pub use flows::{AssistantId, DialogGraph, DialogStack, GraphLayout, Node, Skill};
