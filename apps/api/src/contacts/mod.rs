//! Networking contacts, their interaction log and follow-up reminders.

pub mod filters;
pub mod handlers;
pub mod interactions;
pub mod reminders;
