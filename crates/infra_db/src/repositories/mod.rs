//! Repository implementations for the CRM tables
//!
//! Each repository wraps the generic [`crate::repository::Repository`] for its
//! row type and adds the operations that span several tables. Every query is
//! scoped by the caller's tenant; mailbox tables are further scoped by owner.

pub mod identity;
pub mod persons;
pub mod households;
pub mod tags;
pub mod emails;
pub mod drafts;
pub mod newsletters;

pub use identity::{IdentityRepository, NewSession, ProfileRow, SessionRow, SignUpRecords, TenantRow, UserRow};
pub use persons::{PersonRepository, PersonRow};
pub use households::{HouseholdRepository, HouseholdRow};
pub use tags::{TagRepository, TagRow};
pub use emails::{EmailAttachmentRow, EmailDetail, EmailHeaderRow, EmailRecipientRow, EmailRepository, EmailRow};
pub use drafts::{DraftRepository, DraftRow, DraftSend};
pub use newsletters::{AudienceMember, DueNewsletter, NewsletterRepository, NewsletterRow};
