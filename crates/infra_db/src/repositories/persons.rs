//! Person repository
//!
//! Persons are listed joined with their household's name. Besides the plain
//! column filters a list can be narrowed to the carriers of a tag.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};
use domain_contacts::PersonInput;

use crate::error::DatabaseError;
use crate::repository::{Changeset, ColumnKind, Filter, Repository, SqlValue, Table};
use super::households::HouseholdRow;

/// Repository for persons
#[derive(Debug, Clone)]
pub struct PersonRepository {
    rows: Repository<PersonRow>,
}

impl PersonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rows: Repository::new(pool),
        }
    }

    /// Creates a person; the input is expected to be validated
    pub async fn create(&self, ctx: &TenantContext, input: &PersonInput) -> Result<PersonRow, DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        ensure_household(&mut conn, ctx, input).await?;
        Repository::<PersonRow>::add_on(&mut conn, ctx, person_changes(input)).await
    }

    /// Replaces every editable field of a person
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: &PersonInput,
    ) -> Result<PersonRow, DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        ensure_household(&mut conn, ctx, input).await?;
        Repository::<PersonRow>::update_on(&mut conn, ctx, id, person_changes(input)).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        self.rows.delete(ctx, id).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<PersonRow, DatabaseError> {
        self.rows.find(ctx, id).await
    }

    pub async fn exists(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, DatabaseError> {
        self.rows.exists(ctx, id).await
    }

    pub async fn find_by_email(&self, ctx: &TenantContext, email: &str) -> Result<Option<PersonRow>, DatabaseError> {
        self.rows.find_by(ctx, "email", email).await
    }

    /// Grid listing; supports the `household_id` and `tag_id` filters
    pub async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<Page<PersonRow>, DatabaseError> {
        self.rows.list(ctx, options).await
    }
}

async fn ensure_household(
    conn: &mut sqlx::PgConnection,
    ctx: &TenantContext,
    input: &PersonInput,
) -> Result<(), DatabaseError> {
    if let Some(household_id) = input.household_id {
        let household_id = *household_id.as_uuid();
        if !Repository::<HouseholdRow>::exists_on(conn, ctx, household_id).await? {
            return Err(DatabaseError::not_found("Household", household_id));
        }
    }
    Ok(())
}

fn person_changes(input: &PersonInput) -> Changeset {
    Changeset::new()
        .set("household_id", SqlValue::id(input.household_id))
        .set("first_name", input.first_name.clone())
        .set("middle_name", input.middle_name.clone())
        .set("last_name", input.last_name.clone())
        .set("email", input.email.clone())
        .set("phone", input.phone.clone())
        .set("date_of_birth", input.date_of_birth)
        .set("party_affiliation", input.party_affiliation.clone())
        .set("voter_id", input.voter_id.clone())
        .set("notes", input.notes.clone())
        .set("do_not_contact", input.do_not_contact)
}

/// A person with the name of its household
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PersonRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub household_id: Option<Uuid>,
    pub household_name: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub party_affiliation: Option<String>,
    pub voter_id: Option<String>,
    pub notes: Option<String>,
    pub do_not_contact: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for PersonRow {
    const TABLE: &'static str = "persons";
    const ENTITY: &'static str = "Person";
    const SELECT: &'static str = "t.id, t.tenant_id, t.household_id, h.name AS household_name, \
         t.first_name, t.middle_name, t.last_name, t.email, t.phone, t.date_of_birth, \
         t.party_affiliation, t.voter_id, t.notes, t.do_not_contact, t.created_at, t.updated_at";
    const JOINS: &'static str =
        "LEFT JOIN households h ON h.id = t.household_id AND h.tenant_id = t.tenant_id";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("first_name", "t.first_name"),
        ("last_name", "t.last_name"),
        ("email", "t.email"),
        ("date_of_birth", "t.date_of_birth"),
        ("party_affiliation", "t.party_affiliation"),
        ("household_name", "h.name"),
        ("created_at", "t.created_at"),
        ("updated_at", "t.updated_at"),
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::new("household_id", "t.household_id = ?", ColumnKind::Uuid),
        Filter::new(
            "tag_id",
            "EXISTS (SELECT 1 FROM map_person_tags m WHERE m.person_id = t.id AND m.tag_id = ?)",
            ColumnKind::Uuid,
        ),
        Filter::new("email", "lower(t.email) = lower(?)", ColumnKind::Text),
        Filter::new("party_affiliation", "t.party_affiliation = ?", ColumnKind::Text),
        Filter::new("do_not_contact", "t.do_not_contact = ?", ColumnKind::Bool),
        Filter::new("voter_id", "t.voter_id = ?", ColumnKind::Text),
    ];
    const SEARCHABLE: &'static [&'static str] = &[
        "t.first_name",
        "t.last_name",
        "(t.first_name || ' ' || t.last_name)",
        "t.email",
        "t.phone",
        "t.voter_id",
    ];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("t.last_name", SortOrder::Asc);
}
