//! Premium channel subscription bot: channel catalogue browsing, manual
//! UPI payments reviewed by an admin, invite-link access and a daily
//! expiry job.

pub mod access;
pub mod callback;
pub mod commands;
pub mod handlers;
pub mod keyboards;
pub mod scheduler;
pub mod schema;
pub mod texts;

pub use scheduler::ExpiryScheduler;
pub use schema::{State, schema};
