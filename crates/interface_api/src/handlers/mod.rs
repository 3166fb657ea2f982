//! Request handlers, one module per resource

pub mod auth;
pub mod drafts;
pub mod emails;
pub mod health;
pub mod households;
pub mod newsletters;
pub mod persons;
pub mod tags;
