pub mod booking;
pub mod conversation;
pub mod flight;
pub mod policy;
pub mod session;
pub mod time;
pub mod tool;
