//! Draft repository
//!
//! Drafts keep their recipient lists as JSONB arrays of addresses. Sending a
//! draft locks it for the whole delivery, then stores the sent email and
//! deletes the draft in the same transaction. A concurrent send of the same
//! draft waits for the lock and then finds the draft gone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};
use domain_mail::{DraftInput, MailAddress, OutgoingMessage};

use crate::error::DatabaseError;
use crate::repository::{Changeset, ColumnKind, Filter, Repository, SqlValue, Table};
use super::emails::{insert_sent_on, EmailRow};

/// Repository for the caller's drafts
#[derive(Debug, Clone)]
pub struct DraftRepository {
    rows: Repository<DraftRow>,
}

impl DraftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rows: Repository::new(pool),
        }
    }

    pub async fn create(&self, ctx: &TenantContext, input: &DraftInput) -> Result<DraftRow, DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        ensure_reply_target(&mut conn, ctx, input).await?;
        Repository::<DraftRow>::add_on(&mut conn, ctx, draft_changes(input)?).await
    }

    /// Replaces the content of a draft
    pub async fn update(&self, ctx: &TenantContext, id: Uuid, input: &DraftInput) -> Result<DraftRow, DatabaseError> {
        let mut conn = self.rows.pool().acquire().await?;
        ensure_reply_target(&mut conn, ctx, input).await?;
        Repository::<DraftRow>::update_on(&mut conn, ctx, id, draft_changes(input)?).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        self.rows.delete(ctx, id).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<DraftRow, DatabaseError> {
        self.rows.find(ctx, id).await
    }

    pub async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<Page<DraftRow>, DatabaseError> {
        self.rows.list(ctx, options).await
    }

    /// Locks a draft for sending; dropping the returned guard without
    /// completing it leaves the draft untouched
    pub async fn begin_send(&self, ctx: &TenantContext, id: Uuid) -> Result<DraftSend, DatabaseError> {
        let mut tx = self.rows.pool().begin().await?;
        let draft = Repository::<DraftRow>::lock_on(&mut tx, ctx, id).await?;
        Ok(DraftSend { tx, ctx: *ctx, draft })
    }
}

/// A draft locked for delivery
pub struct DraftSend {
    tx: Transaction<'static, Postgres>,
    ctx: TenantContext,
    draft: DraftRow,
}

impl std::fmt::Debug for DraftSend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftSend")
            .field("ctx", &self.ctx)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

impl DraftSend {
    pub fn draft(&self) -> &DraftRow {
        &self.draft
    }

    /// Records the delivered message as sent and deletes the draft
    pub async fn complete(mut self, message: &OutgoingMessage) -> Result<EmailRow, DatabaseError> {
        let draft_id = self.draft.id;
        Repository::<DraftRow>::delete_on(&mut self.tx, &self.ctx, draft_id).await?;
        let email_id = insert_sent_on(&mut self.tx, &self.ctx, message).await?;
        let email = Repository::<EmailRow>::find_on(&mut self.tx, &self.ctx, email_id).await?;

        self.tx.commit().await?;
        info!(%draft_id, %email_id, "Draft sent");
        Ok(email)
    }
}

async fn ensure_reply_target(
    conn: &mut sqlx::PgConnection,
    ctx: &TenantContext,
    input: &DraftInput,
) -> Result<(), DatabaseError> {
    if let Some(email_id) = input.in_reply_to_email_id {
        let email_id = *email_id.as_uuid();
        if !Repository::<EmailRow>::exists_on(conn, ctx, email_id).await? {
            return Err(DatabaseError::not_found(EmailRow::ENTITY, email_id));
        }
    }
    Ok(())
}

fn addresses(list: &[MailAddress]) -> Result<serde_json::Value, DatabaseError> {
    serde_json::to_value(list).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

fn draft_changes(input: &DraftInput) -> Result<Changeset, DatabaseError> {
    Ok(Changeset::new()
        .set("to_recipients", addresses(&input.to)?)
        .set("cc_recipients", addresses(&input.cc)?)
        .set("bcc_recipients", addresses(&input.bcc)?)
        .set("subject", input.subject.clone())
        .set("body_text", input.body_text.clone())
        .set("body_html", input.body_html.clone())
        .set("in_reply_to_email_id", SqlValue::id(input.in_reply_to_email_id)))
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DraftRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub to_recipients: Json<Vec<MailAddress>>,
    pub cc_recipients: Json<Vec<MailAddress>>,
    pub bcc_recipients: Json<Vec<MailAddress>>,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub in_reply_to_email_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftRow {
    /// The draft's content as an editable input
    pub fn to_input(&self) -> DraftInput {
        DraftInput {
            to: self.to_recipients.0.clone(),
            cc: self.cc_recipients.0.clone(),
            bcc: self.bcc_recipients.0.clone(),
            subject: self.subject.clone(),
            body_text: self.body_text.clone(),
            body_html: self.body_html.clone(),
            in_reply_to_email_id: self.in_reply_to_email_id.map(Into::into),
        }
    }
}

impl Table for DraftRow {
    const TABLE: &'static str = "email_drafts";
    const ENTITY: &'static str = "Draft";
    const SELECT: &'static str = "t.id, t.tenant_id, t.owner_id, t.to_recipients, t.cc_recipients, \
         t.bcc_recipients, t.subject, t.body_text, t.body_html, t.in_reply_to_email_id, \
         t.created_at, t.updated_at";
    const OWNER_COLUMN: Option<&'static str> = Some("owner_id");
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("subject", "t.subject"),
        ("created_at", "t.created_at"),
        ("updated_at", "t.updated_at"),
    ];
    const FILTERS: &'static [Filter] = &[Filter::new(
        "in_reply_to_email_id",
        "t.in_reply_to_email_id = ?",
        ColumnKind::Uuid,
    )];
    const SEARCHABLE: &'static [&'static str] = &["t.subject", "t.body_text"];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("t.updated_at", SortOrder::Desc);
}
