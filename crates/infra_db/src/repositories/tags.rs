//! Tag repository
//!
//! Tags and the `map_person_tags` / `map_household_tags` mapping tables.
//! Tagging is idempotent; untagging a record that does not carry the tag is
//! reported as not found.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};
use domain_contacts::{TagInput, TagTarget};

use crate::error::DatabaseError;
use crate::repository::{Changeset, ColumnKind, Filter, Repository, Table};
use super::households::HouseholdRow;
use super::persons::{PersonRepository, PersonRow};

/// Mapping table and key column for a tag target
fn mapping(target: TagTarget) -> (&'static str, &'static str) {
    match target {
        TagTarget::Person => ("map_person_tags", "person_id"),
        TagTarget::Household => ("map_household_tags", "household_id"),
    }
}

/// Repository for tags and tag assignments
#[derive(Debug, Clone)]
pub struct TagRepository {
    rows: Repository<TagRow>,
    persons: PersonRepository,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rows: Repository::new(pool.clone()),
            persons: PersonRepository::new(pool),
        }
    }

    /// Creates a tag; a name already used in the tenant is a duplicate
    pub async fn create(&self, ctx: &TenantContext, input: &TagInput) -> Result<TagRow, DatabaseError> {
        self.rows
            .add(ctx, tag_changes(input))
            .await
            .map_err(|e| duplicate_name(e, &input.name))
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, input: &TagInput) -> Result<TagRow, DatabaseError> {
        self.rows
            .update(ctx, id, tag_changes(input))
            .await
            .map_err(|e| duplicate_name(e, &input.name))
    }

    /// Deletes a tag and, by cascade, all its assignments
    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        self.rows.delete(ctx, id).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<TagRow, DatabaseError> {
        self.rows.find(ctx, id).await
    }

    pub async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<Page<TagRow>, DatabaseError> {
        self.rows.list(ctx, options).await
    }

    async fn ensure_target(
        &self,
        conn: &mut sqlx::PgConnection,
        ctx: &TenantContext,
        target: TagTarget,
        target_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let exists = match target {
            TagTarget::Person => Repository::<PersonRow>::exists_on(conn, ctx, target_id).await?,
            TagTarget::Household => Repository::<HouseholdRow>::exists_on(conn, ctx, target_id).await?,
        };
        if !exists {
            let entity = match target {
                TagTarget::Person => PersonRow::ENTITY,
                TagTarget::Household => HouseholdRow::ENTITY,
            };
            return Err(DatabaseError::not_found(entity, target_id));
        }
        Ok(())
    }

    /// Attaches a tag; attaching it twice is a no-op
    pub async fn tag(
        &self,
        ctx: &TenantContext,
        target: TagTarget,
        target_id: Uuid,
        tag_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        if !Repository::<TagRow>::exists_on(&mut conn, ctx, tag_id).await? {
            return Err(DatabaseError::not_found(TagRow::ENTITY, tag_id));
        }
        self.ensure_target(&mut conn, ctx, target, target_id).await?;

        let (table, column) = mapping(target);
        sqlx::query(&format!(
            "INSERT INTO {} (tenant_id, {}, tag_id) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            table, column
        ))
        .bind(ctx.tenant_id.as_uuid())
        .bind(target_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;

        debug!(%target, %target_id, %tag_id, "Tag attached");
        Ok(())
    }

    pub async fn untag(
        &self,
        ctx: &TenantContext,
        target: TagTarget,
        target_id: Uuid,
        tag_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let (table, column) = mapping(target);
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE tenant_id = $1 AND {} = $2 AND tag_id = $3",
            table, column
        ))
        .bind(ctx.tenant_id.as_uuid())
        .bind(target_id)
        .bind(tag_id)
        .execute(self.rows.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "{} '{}' does not carry tag '{}'",
                target, target_id, tag_id
            )));
        }
        Ok(())
    }

    /// Tags attached to a person or household, by name
    pub async fn tags_of(
        &self,
        ctx: &TenantContext,
        target: TagTarget,
        target_id: Uuid,
    ) -> Result<Vec<TagRow>, DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        self.ensure_target(&mut conn, ctx, target, target_id).await?;

        let (table, column) = mapping(target);
        let tags = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {} FROM tags t JOIN {} m ON m.tag_id = t.id \
             WHERE t.tenant_id = $1 AND m.{} = $2 \
             ORDER BY t.name",
            TagRow::SELECT,
            table,
            column
        ))
        .bind(ctx.tenant_id.as_uuid())
        .bind(target_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(tags)
    }

    /// Persons carrying a tag, as a grid page
    pub async fn persons_with_tag(
        &self,
        ctx: &TenantContext,
        tag_id: Uuid,
        options: ListOptions,
    ) -> Result<Page<PersonRow>, DatabaseError> {
        if !self.rows.exists(ctx, tag_id).await? {
            return Err(DatabaseError::not_found(TagRow::ENTITY, tag_id));
        }
        let options = options.with_filter("tag_id", tag_id.to_string());
        self.persons.list(ctx, &options).await
    }
}

fn duplicate_name(error: DatabaseError, name: &str) -> DatabaseError {
    match error {
        DatabaseError::DuplicateEntry(_) => DatabaseError::duplicate(TagRow::ENTITY, "name", name),
        other => other,
    }
}

fn tag_changes(input: &TagInput) -> Changeset {
    Changeset::new()
        .set("name", input.name.clone())
        .set("color", input.color.clone())
        .set("description", input.description.clone())
}

/// A tag with its usage counts
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TagRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub person_count: i64,
    pub household_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for TagRow {
    const TABLE: &'static str = "tags";
    const ENTITY: &'static str = "Tag";
    const SELECT: &'static str = "t.id, t.tenant_id, t.name, t.color, t.description, \
         (SELECT COUNT(*) FROM map_person_tags mp WHERE mp.tag_id = t.id) AS person_count, \
         (SELECT COUNT(*) FROM map_household_tags mh WHERE mh.tag_id = t.id) AS household_count, \
         t.created_at, t.updated_at";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("name", "t.name"),
        ("color", "t.color"),
        ("person_count", "person_count"),
        ("household_count", "household_count"),
        ("created_at", "t.created_at"),
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::new("name", "lower(t.name) = lower(?)", ColumnKind::Text),
        Filter::new("color", "t.color = lower(?)", ColumnKind::Text),
    ];
    const SEARCHABLE: &'static [&'static str] = &["t.name", "t.description"];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("t.name", SortOrder::Asc);
}
