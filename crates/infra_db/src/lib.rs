//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the CRM, built on SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. A generic [`Repository`] knows
//! how to insert, update, delete and page through any [`Table`]; the
//! repositories in [`repositories`] add the multi-table operations of each
//! aggregate (sign-up, tagging, the mailbox, newsletter delivery).
//!
//! Every row belongs to a tenant and every query is scoped by the
//! [`core_kernel::TenantContext`] of the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::repositories::PersonRepository;
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/civic_crm")).await?;
//! run_migrations(&pool).await?;
//! let persons = PersonRepository::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repository;
pub mod repositories;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repository::{Changeset, Repository, SqlValue, Table};
