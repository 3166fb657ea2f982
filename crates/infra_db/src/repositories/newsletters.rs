//! Newsletter repository
//!
//! State changes lock the newsletter row and check the transition against
//! [`NewsletterStatus`] before writing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};
use domain_mail::{MailError, NewsletterInput, NewsletterStatus};

use crate::error::DatabaseError;
use crate::repository::{Changeset, ColumnKind, Filter, Repository, SqlValue, Table};
use super::tags::TagRow;

/// Repository for newsletters and their audiences
#[derive(Debug, Clone)]
pub struct NewsletterRepository {
    rows: Repository<NewsletterRow>,
}

impl NewsletterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rows: Repository::new(pool),
        }
    }

    /// Creates a draft newsletter authored by the caller
    pub async fn create(&self, ctx: &TenantContext, input: &NewsletterInput) -> Result<NewsletterRow, DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        ensure_audience_tag(&mut conn, ctx, input).await?;
        let changes = newsletter_changes(input)
            .set("author_id", *ctx.user_id.as_uuid())
            .set("status", NewsletterStatus::Draft.as_str());
        Repository::<NewsletterRow>::add_on(&mut conn, ctx, changes).await
    }

    /// Edits a newsletter that is still a draft
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: &NewsletterInput,
    ) -> Result<NewsletterRow, DatabaseError> {
        let mut tx = self.rows.pool().begin().await?;
        lock_status(&mut tx, ctx, id).await?.ensure_editable()?;
        ensure_audience_tag(&mut tx, ctx, input).await?;
        let row = Repository::<NewsletterRow>::update_on(&mut tx, ctx, id, newsletter_changes(input)).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Deletes a newsletter that has not been sent
    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.rows.pool().begin().await?;
        lock_status(&mut tx, ctx, id).await?.ensure_deletable()?;
        Repository::<NewsletterRow>::delete_on(&mut tx, ctx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<NewsletterRow, DatabaseError> {
        self.rows.find(ctx, id).await
    }

    pub async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<Page<NewsletterRow>, DatabaseError> {
        self.rows.list(ctx, options).await
    }

    /// Schedules delivery at `at`, which must lie after `now`
    pub async fn schedule(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<NewsletterRow, DatabaseError> {
        let mut tx = self.rows.pool().begin().await?;
        let status = lock_status(&mut tx, ctx, id).await?.schedule(at, now)?;
        let changes = Changeset::new()
            .set("status", status.as_str())
            .set("scheduled_for", at);
        let row = Repository::<NewsletterRow>::update_on(&mut tx, ctx, id, changes).await?;
        tx.commit().await?;
        info!(newsletter_id = %id, scheduled_for = %at, "Newsletter scheduled");
        Ok(row)
    }

    /// Returns a scheduled newsletter to draft
    pub async fn unschedule(&self, ctx: &TenantContext, id: Uuid) -> Result<NewsletterRow, DatabaseError> {
        let mut tx = self.rows.pool().begin().await?;
        let status = lock_status(&mut tx, ctx, id).await?.unschedule()?;
        let changes = Changeset::new()
            .set("status", status.as_str())
            .set("scheduled_for", None::<DateTime<Utc>>);
        let row = Repository::<NewsletterRow>::update_on(&mut tx, ctx, id, changes).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Persons of the tenant who may receive a newsletter.
    ///
    /// A person qualifies with an email address and without the
    /// do-not-contact flag; with `tag_id` they must also carry that tag.
    /// Addresses shared by several persons are returned once.
    pub async fn audience(
        &self,
        ctx: &TenantContext,
        tag_id: Option<Uuid>,
    ) -> Result<Vec<AudienceMember>, DatabaseError> {
        let members = sqlx::query_as::<_, AudienceMember>(
            "SELECT DISTINCT ON (lower(p.email)) p.id AS person_id, p.email, p.first_name, p.last_name \
             FROM persons p \
             WHERE p.tenant_id = $1 \
               AND p.email IS NOT NULL AND p.email <> '' \
               AND NOT p.do_not_contact \
               AND ($2::uuid IS NULL OR EXISTS ( \
                   SELECT 1 FROM map_person_tags m WHERE m.person_id = p.id AND m.tag_id = $2)) \
             ORDER BY lower(p.email), p.created_at",
        )
        .bind(ctx.tenant_id.as_uuid())
        .bind(tag_id)
        .fetch_all(self.rows.pool())
        .await?;
        Ok(members)
    }

    /// Takes a draft or scheduled newsletter for delivery by moving it to
    /// `sending`
    ///
    /// # Errors
    ///
    /// `Conflict` when it is already being sent or was sent
    pub async fn claim(&self, ctx: &TenantContext, id: Uuid) -> Result<NewsletterRow, DatabaseError> {
        self.transition(ctx, id, |status| status.claim(), Changeset::new()).await
    }

    /// Marks a claimed newsletter sent to `recipient_count` persons
    pub async fn mark_sent(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        recipient_count: i64,
    ) -> Result<NewsletterRow, DatabaseError> {
        let changes = Changeset::new()
            .set("sent_at", Utc::now())
            .set("recipient_count", recipient_count);
        let row = self.transition(ctx, id, |status| status.finish(), changes).await?;
        info!(newsletter_id = %id, recipient_count, "Newsletter marked sent");
        Ok(row)
    }

    /// Returns a claimed newsletter that could not be delivered to draft,
    /// dropping its schedule
    pub async fn release(&self, ctx: &TenantContext, id: Uuid) -> Result<NewsletterRow, DatabaseError> {
        let changes = Changeset::new().set("scheduled_for", None::<DateTime<Utc>>);
        let row = self.transition(ctx, id, |status| status.release(), changes).await?;
        info!(newsletter_id = %id, "Newsletter returned to draft");
        Ok(row)
    }

    async fn transition(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        next: impl FnOnce(NewsletterStatus) -> Result<NewsletterStatus, MailError>,
        changes: Changeset,
    ) -> Result<NewsletterRow, DatabaseError> {
        let mut tx = self.rows.pool().begin().await?;
        let status = next(lock_status(&mut tx, ctx, id).await?)?;
        let changes = changes.set("status", status.as_str());
        let row = Repository::<NewsletterRow>::update_on(&mut tx, ctx, id, changes).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Claims the scheduled newsletters of every tenant whose time has come.
    ///
    /// Rows locked by a concurrent claim are skipped, so each due newsletter
    /// is handed to exactly one caller.
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<DueNewsletter>, DatabaseError> {
        let due = sqlx::query_as::<_, DueNewsletter>(
            "UPDATE newsletters SET status = $1, updated_at = now() \
             WHERE id IN ( \
                 SELECT id FROM newsletters \
                 WHERE status = $2 AND scheduled_for <= $3 \
                 ORDER BY scheduled_for \
                 FOR UPDATE SKIP LOCKED) \
             RETURNING id, tenant_id, author_id",
        )
        .bind(NewsletterStatus::Sending.as_str())
        .bind(NewsletterStatus::Scheduled.as_str())
        .bind(now)
        .fetch_all(self.rows.pool())
        .await?;
        Ok(due)
    }
}

async fn lock_status(conn: &mut PgConnection, ctx: &TenantContext, id: Uuid) -> Result<NewsletterStatus, DatabaseError> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM newsletters WHERE id = $1 AND tenant_id = $2 FOR UPDATE")
            .bind(id)
            .bind(ctx.tenant_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
    let status = status.ok_or_else(|| DatabaseError::not_found(NewsletterRow::ENTITY, id))?;
    Ok(status.parse::<NewsletterStatus>()?)
}

async fn ensure_audience_tag(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    input: &NewsletterInput,
) -> Result<(), DatabaseError> {
    if let Some(tag_id) = input.audience_tag_id {
        let tag_id = *tag_id.as_uuid();
        if !Repository::<TagRow>::exists_on(conn, ctx, tag_id).await? {
            return Err(DatabaseError::not_found(TagRow::ENTITY, tag_id));
        }
    }
    Ok(())
}

fn newsletter_changes(input: &NewsletterInput) -> Changeset {
    Changeset::new()
        .set("subject", input.subject.trim())
        .set("body_text", input.body_text.clone())
        .set("body_html", input.body_html.clone())
        .set("audience_tag_id", SqlValue::id(input.audience_tag_id))
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NewsletterRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub author_id: Uuid,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: NewsletterStatus,
    pub audience_tag_id: Option<Uuid>,
    pub audience_tag_name: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub recipient_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for NewsletterRow {
    const TABLE: &'static str = "newsletters";
    const ENTITY: &'static str = "Newsletter";
    const SELECT: &'static str = "t.id, t.tenant_id, t.author_id, t.subject, t.body_text, t.body_html, \
         t.status, t.audience_tag_id, g.name AS audience_tag_name, t.scheduled_for, t.sent_at, \
         t.recipient_count, t.created_at, t.updated_at";
    const JOINS: &'static str =
        "LEFT JOIN tags g ON g.id = t.audience_tag_id AND g.tenant_id = t.tenant_id";
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("subject", "t.subject"),
        ("status", "t.status"),
        ("scheduled_for", "t.scheduled_for"),
        ("sent_at", "t.sent_at"),
        ("recipient_count", "t.recipient_count"),
        ("created_at", "t.created_at"),
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::new("status", "t.status = lower(?)", ColumnKind::Text),
        Filter::new("audience_tag_id", "t.audience_tag_id = ?", ColumnKind::Uuid),
        Filter::new("author_id", "t.author_id = ?", ColumnKind::Uuid),
    ];
    const SEARCHABLE: &'static [&'static str] = &["t.subject", "g.name"];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("t.created_at", SortOrder::Desc);
}

/// A person a newsletter goes to
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AudienceMember {
    pub person_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl AudienceMember {
    /// Name used to personalize the newsletter, if any
    pub fn name(&self) -> Option<String> {
        let name = domain_identity::display_name(&self.first_name, &self.last_name);
        (!name.is_empty()).then_some(name)
    }
}

/// A scheduled newsletter claimed for delivery
#[derive(Debug, Clone, FromRow)]
pub struct DueNewsletter {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub author_id: Uuid,
}
