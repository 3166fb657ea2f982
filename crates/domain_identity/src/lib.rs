//! Identity Domain
//!
//! Tenants, the users that sign into them, their profiles and sessions.
//!
//! A tenant is a customer organization. Signing up creates a tenant together
//! with its first user (the owner), that user's profile and a session, so the
//! rules for all four live here and the database layer runs them in one
//! transaction.

pub mod tenant;
pub mod user;
pub mod profile;
pub mod session;
pub mod password;
pub mod signup;
pub mod error;

pub use tenant::{Tenant, slugify};
pub use user::{Role, NewMember, normalize_email};
pub use profile::{ProfileUpdate, display_name};
pub use session::{SessionPolicy, DEFAULT_SESSION_TTL_SECS};
pub use password::{hash_password, verify_password, verify_sign_in, check_password_strength};
pub use signup::{SignUp, SignIn, ValidatedSignUp};
pub use error::IdentityError;
