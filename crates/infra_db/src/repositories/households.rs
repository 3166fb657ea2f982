//! Household repository
//!
//! Membership is the `household_id` column of persons. Deleting a household
//! detaches its members through the `ON DELETE SET NULL` foreign key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};
use domain_contacts::HouseholdInput;

use crate::error::DatabaseError;
use crate::repository::{Changeset, ColumnKind, Filter, Repository, Table};
use super::persons::{PersonRepository, PersonRow};

/// Repository for households and their members
#[derive(Debug, Clone)]
pub struct HouseholdRepository {
    rows: Repository<HouseholdRow>,
    persons: PersonRepository,
}

impl HouseholdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rows: Repository::new(pool.clone()),
            persons: PersonRepository::new(pool),
        }
    }

    pub async fn create(&self, ctx: &TenantContext, input: &HouseholdInput) -> Result<HouseholdRow, DatabaseError> {
        self.rows.add(ctx, household_changes(input)).await
    }

    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: &HouseholdInput,
    ) -> Result<HouseholdRow, DatabaseError> {
        self.rows.update(ctx, id, household_changes(input)).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        self.rows.delete(ctx, id).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<HouseholdRow, DatabaseError> {
        self.rows.find(ctx, id).await
    }

    pub async fn exists(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, DatabaseError> {
        self.rows.exists(ctx, id).await
    }

    pub async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<Page<HouseholdRow>, DatabaseError> {
        self.rows.list(ctx, options).await
    }

    /// Persons living in a household, as a grid page
    pub async fn members(
        &self,
        ctx: &TenantContext,
        household_id: Uuid,
        options: ListOptions,
    ) -> Result<Page<PersonRow>, DatabaseError> {
        if !self.rows.exists(ctx, household_id).await? {
            return Err(DatabaseError::not_found(HouseholdRow::ENTITY, household_id));
        }
        let options = options.with_filter("household_id", household_id.to_string());
        self.persons.list(ctx, &options).await
    }

    /// Moves a person into the household, leaving any previous one
    pub async fn add_member(
        &self,
        ctx: &TenantContext,
        household_id: Uuid,
        person_id: Uuid,
    ) -> Result<PersonRow, DatabaseError> {
        if !self.rows.exists(ctx, household_id).await? {
            return Err(DatabaseError::not_found(HouseholdRow::ENTITY, household_id));
        }
        let result = sqlx::query(
            "UPDATE persons SET household_id = $1, updated_at = now() WHERE id = $2 AND tenant_id = $3",
        )
        .bind(household_id)
        .bind(person_id)
        .bind(ctx.tenant_id.as_uuid())
        .execute(self.rows.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(PersonRow::ENTITY, person_id));
        }
        debug!(%household_id, %person_id, "Person joined household");
        self.persons.get(ctx, person_id).await
    }

    pub async fn remove_member(
        &self,
        ctx: &TenantContext,
        household_id: Uuid,
        person_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE persons SET household_id = NULL, updated_at = now() \
             WHERE id = $1 AND tenant_id = $2 AND household_id = $3",
        )
        .bind(person_id)
        .bind(ctx.tenant_id.as_uuid())
        .bind(household_id)
        .execute(self.rows.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Person '{}' is not a member of household '{}'",
                person_id, household_id
            )));
        }
        Ok(())
    }
}

fn household_changes(input: &HouseholdInput) -> Changeset {
    Changeset::new()
        .set("name", input.name.clone())
        .set("address_line1", input.address_line1.clone())
        .set("address_line2", input.address_line2.clone())
        .set("city", input.city.clone())
        .set("region", input.region.clone())
        .set("postal_code", input.postal_code.clone())
        .set("country", input.country.clone())
        .set("phone", input.phone.clone())
        .set("notes", input.notes.clone())
}

/// A household with its member count
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HouseholdRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for HouseholdRow {
    const TABLE: &'static str = "households";
    const ENTITY: &'static str = "Household";
    const SELECT: &'static str = "t.id, t.tenant_id, t.name, t.address_line1, t.address_line2, \
         t.city, t.region, t.postal_code, t.country, t.phone, t.notes, \
         (SELECT COUNT(*) FROM persons p WHERE p.household_id = t.id) AS member_count, \
         t.created_at, t.updated_at";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("name", "t.name"),
        ("city", "t.city"),
        ("region", "t.region"),
        ("postal_code", "t.postal_code"),
        ("member_count", "member_count"),
        ("created_at", "t.created_at"),
        ("updated_at", "t.updated_at"),
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::new("city", "lower(t.city) = lower(?)", ColumnKind::Text),
        Filter::new("region", "lower(t.region) = lower(?)", ColumnKind::Text),
        Filter::new("postal_code", "t.postal_code = upper(?)", ColumnKind::Text),
        Filter::new("country", "t.country = upper(?)", ColumnKind::Text),
        Filter::new(
            "tag_id",
            "EXISTS (SELECT 1 FROM map_household_tags m WHERE m.household_id = t.id AND m.tag_id = ?)",
            ColumnKind::Uuid,
        ),
    ];
    const SEARCHABLE: &'static [&'static str] =
        &["t.name", "t.address_line1", "t.city", "t.postal_code"];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("t.name", SortOrder::Asc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_keep_normalized_values() {
        let input = HouseholdInput {
            name: "The Smiths".to_string(),
            postal_code: Some("sw1a 1aa".to_string()),
            ..Default::default()
        }
        .normalized();
        let changes = household_changes(&input);
        assert_eq!(changes.len(), 9);
        assert_eq!(
            changes.get("postal_code"),
            Some(&crate::repository::SqlValue::Text(Some("SW1A 1AA".to_string())))
        );
    }
}
