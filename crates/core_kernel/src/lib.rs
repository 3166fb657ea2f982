//! Core Kernel - Foundational types shared by every CRM crate
//!
//! This crate provides the building blocks used across the domain and
//! infrastructure modules:
//! - Strongly-typed identifiers for every table
//! - The tenant context that scopes all data access
//! - List options and pages for server-side paginated grids
//! - A small common error type

pub mod identifiers;
pub mod tenant;
pub mod listing;
pub mod error;

pub use identifiers::{
    TenantId, UserId, ProfileId, SessionId, PersonId, HouseholdId, TagId,
    EmailId, DraftId, NewsletterId, AttachmentId,
};
pub use tenant::TenantContext;
pub use listing::{ListOptions, Page, SortOrder, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use error::CoreError;
