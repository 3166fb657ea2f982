//! Email repository
//!
//! Mailboxes are per user: every query is scoped to the caller's tenant and
//! to emails they own.
//!
//! # Trash
//!
//! Trashing is a soft delete in two statements run in one transaction:
//!
//! 1. record the current folder in `email_trash`
//! 2. set the email's folder to `trash`
//!
//! Restoring drops the `email_trash` row and puts the email back into the
//! recorded folder. Only trashed emails can be deleted for good.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};
use domain_mail::{
    ensure_purgeable, plan_trash, restore_target, Folder, IncomingEmail, MailAddress,
    OutgoingMessage, RecipientKind,
};

use crate::error::DatabaseError;
use crate::repository::{Changeset, ColumnKind, Filter, Repository, Table};

/// Repository for emails, their parts and the trash
#[derive(Debug, Clone)]
pub struct EmailRepository {
    rows: Repository<EmailRow>,
}

impl EmailRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rows: Repository::new(pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.rows.pool()
    }

    /// Grid listing; callers pass the `folder` filter to browse one folder
    pub async fn list(&self, ctx: &TenantContext, options: &ListOptions) -> Result<Page<EmailRow>, DatabaseError> {
        self.rows.list(ctx, options).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<EmailRow, DatabaseError> {
        self.rows.find(ctx, id).await
    }

    /// An email with its headers, recipients and attachments
    pub async fn detail(&self, ctx: &TenantContext, id: Uuid) -> Result<EmailDetail, DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        load_detail(&mut conn, ctx, id).await
    }

    /// Marks read/unread and starred/unstarred; absent flags are kept
    pub async fn set_flags(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        is_read: Option<bool>,
        is_starred: Option<bool>,
    ) -> Result<EmailRow, DatabaseError> {
        let changes = Changeset::new()
            .set_some("is_read", is_read)
            .set_some("is_starred", is_starred);
        if changes.is_empty() {
            return self.get(ctx, id).await;
        }
        self.rows.update(ctx, id, changes).await
    }

    /// Files an email under another folder.
    ///
    /// The trash is not a valid target. Moving a trashed email out drops its
    /// trash record.
    pub async fn move_to(&self, ctx: &TenantContext, id: Uuid, folder: Folder) -> Result<EmailRow, DatabaseError> {
        folder.ensure_move_target()?;
        let mut tx = self.pool().begin().await?;

        let current = lock_folder(&mut tx, ctx, id).await?;
        if current.is_trash() {
            forget_trash(&mut tx, ctx, id).await?;
        }
        set_folder(&mut tx, ctx, id, folder).await?;
        let email = Repository::<EmailRow>::find_on(&mut tx, ctx, id).await?;

        tx.commit().await?;
        debug!(email_id = %id, from = %current, to = %folder, "Email moved");
        Ok(email)
    }

    /// Stores a received email in the inbox with all its parts, addresses
    /// normalized the same way as composed mail
    pub async fn ingest(&self, ctx: &TenantContext, email: &IncomingEmail) -> Result<EmailDetail, DatabaseError> {
        let email = email.clone().normalized()?;
        let mut tx = self.pool().begin().await?;
        let id = Uuid::now_v7();
        let received_at = email.received_at.unwrap_or_else(Utc::now);

        sqlx::query(
            "INSERT INTO emails (id, tenant_id, owner_id, folder, subject, snippet, body_text, \
             body_html, from_address, from_name, message_id, in_reply_to, has_attachments, received_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(id)
        .bind(ctx.tenant_id.as_uuid())
        .bind(ctx.user_id.as_uuid())
        .bind(Folder::Inbox.as_str())
        .bind(email.subject.trim())
        .bind(email.snippet())
        .bind(email.body_text.as_deref())
        .bind(email.body_html.as_deref())
        .bind(&email.from.address)
        .bind(email.from.name.as_deref())
        .bind(email.message_id.as_deref())
        .bind(email.in_reply_to.as_deref())
        .bind(!email.attachments.is_empty())
        .bind(received_at)
        .execute(&mut *tx)
        .await?;

        let recipients = email
            .to
            .iter()
            .map(|a| (RecipientKind::To, a))
            .chain(email.cc.iter().map(|a| (RecipientKind::Cc, a)));
        insert_recipients(&mut tx, ctx, id, recipients).await?;
        insert_headers(
            &mut tx,
            ctx,
            id,
            email.headers.iter().map(|h| (h.name.as_str(), h.value.as_str())),
        )
        .await?;

        if !email.attachments.is_empty() {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO email_attachments (id, tenant_id, email_id, filename, content_type, size_bytes, storage_key) ",
            );
            builder.push_values(&email.attachments, |mut row, attachment| {
                row.push_bind(Uuid::now_v7())
                    .push_bind(*ctx.tenant_id.as_uuid())
                    .push_bind(id)
                    .push_bind(attachment.filename.clone())
                    .push_bind(attachment.content_type.clone())
                    .push_bind(attachment.size_bytes)
                    .push_bind(attachment.storage_key.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        let detail = load_detail(&mut tx, ctx, id).await?;
        tx.commit().await?;
        info!(email_id = %id, from = %email.from.address, "Email received");
        Ok(detail)
    }

    /// Stores a delivered message in the sent folder
    pub async fn store_sent(&self, ctx: &TenantContext, message: &OutgoingMessage) -> Result<EmailRow, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let id = insert_sent_on(&mut tx, ctx, message).await?;
        let email = Repository::<EmailRow>::find_on(&mut tx, ctx, id).await?;
        tx.commit().await?;
        Ok(email)
    }

    /// Moves an email to the trash, remembering its folder
    ///
    /// # Errors
    ///
    /// `Conflict` when the email is already in the trash
    pub async fn trash(&self, ctx: &TenantContext, id: Uuid) -> Result<EmailRow, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let current = lock_folder(&mut tx, ctx, id).await?;
        trash_on(&mut tx, ctx, id, current).await?;
        let email = Repository::<EmailRow>::find_on(&mut tx, ctx, id).await?;
        tx.commit().await?;
        Ok(email)
    }

    /// Trashes many emails in one transaction.
    ///
    /// Emails already in the trash are skipped; an unknown id aborts the
    /// whole batch. Returns how many emails were moved.
    pub async fn trash_many(&self, ctx: &TenantContext, ids: &[Uuid]) -> Result<u64, DatabaseError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut tx = self.pool().begin().await?;
        let mut moved = 0;
        for id in ids {
            let current = lock_folder(&mut tx, ctx, id).await?;
            if current.is_trash() {
                continue;
            }
            trash_on(&mut tx, ctx, id, current).await?;
            moved += 1;
        }
        tx.commit().await?;
        info!(moved, "Emails trashed");
        Ok(moved)
    }

    /// Puts a trashed email back where it came from
    ///
    /// # Errors
    ///
    /// `NotFound` when the email does not exist or is not in the trash
    pub async fn restore(&self, ctx: &TenantContext, id: Uuid) -> Result<EmailRow, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let current = lock_folder(&mut tx, ctx, id).await?;
        if !current.is_trash() {
            return Err(DatabaseError::NotFound(format!("Email '{}' is not in the trash", id)));
        }
        let previous = forget_trash(&mut tx, ctx, id).await?;
        let target = restore_target(previous);
        set_folder(&mut tx, ctx, id, target).await?;
        let email = Repository::<EmailRow>::find_on(&mut tx, ctx, id).await?;

        tx.commit().await?;
        debug!(email_id = %id, folder = %target, "Email restored");
        Ok(email)
    }

    /// Deletes a trashed email for good
    ///
    /// # Errors
    ///
    /// `Conflict` when the email is not in the trash
    pub async fn purge(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let current = lock_folder(&mut tx, ctx, id).await?;
        ensure_purgeable(current)?;
        Repository::<EmailRow>::delete_on(&mut tx, ctx, id).await?;
        tx.commit().await?;
        info!(email_id = %id, "Email deleted permanently");
        Ok(())
    }

    /// Permanently deletes every email in the caller's trash
    pub async fn empty_trash(&self, ctx: &TenantContext) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM emails WHERE tenant_id = $1 AND owner_id = $2 AND folder = $3")
            .bind(ctx.tenant_id.as_uuid())
            .bind(ctx.user_id.as_uuid())
            .bind(Folder::Trash.as_str())
            .execute(self.pool())
            .await?;
        info!(deleted = result.rows_affected(), "Trash emptied");
        Ok(result.rows_affected())
    }
}

/// Current folder of an owned email, locking the row
async fn lock_folder(conn: &mut PgConnection, ctx: &TenantContext, id: Uuid) -> Result<Folder, DatabaseError> {
    let folder: Option<String> = sqlx::query_scalar(
        "SELECT folder FROM emails WHERE id = $1 AND tenant_id = $2 AND owner_id = $3 FOR UPDATE",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .bind(ctx.user_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    let folder = folder.ok_or_else(|| DatabaseError::not_found(EmailRow::ENTITY, id))?;
    Ok(folder.parse::<Folder>()?)
}

async fn set_folder(conn: &mut PgConnection, ctx: &TenantContext, id: Uuid, folder: Folder) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE emails SET folder = $1, updated_at = now() WHERE id = $2 AND tenant_id = $3")
        .bind(folder.as_str())
        .bind(id)
        .bind(ctx.tenant_id.as_uuid())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn trash_on(conn: &mut PgConnection, ctx: &TenantContext, id: Uuid, current: Folder) -> Result<(), DatabaseError> {
    let decision = plan_trash(current)?;
    sqlx::query(
        "INSERT INTO email_trash (email_id, tenant_id, previous_folder) VALUES ($1, $2, $3) \
         ON CONFLICT (email_id) DO UPDATE \
         SET previous_folder = EXCLUDED.previous_folder, trashed_at = now()",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .bind(decision.previous_folder.as_str())
    .execute(&mut *conn)
    .await?;
    set_folder(conn, ctx, id, Folder::Trash).await?;
    debug!(email_id = %id, previous = %decision.previous_folder, "Email trashed");
    Ok(())
}

/// Drops the trash record, returning the folder it remembered
async fn forget_trash(conn: &mut PgConnection, ctx: &TenantContext, id: Uuid) -> Result<Option<Folder>, DatabaseError> {
    let previous: Option<String> = sqlx::query_scalar(
        "DELETE FROM email_trash WHERE email_id = $1 AND tenant_id = $2 RETURNING previous_folder",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(previous.and_then(|f| f.parse().ok()))
}

async fn insert_recipients<'a>(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    email_id: Uuid,
    recipients: impl Iterator<Item = (RecipientKind, &'a MailAddress)>,
) -> Result<(), DatabaseError> {
    let recipients: Vec<_> = recipients.collect();
    if recipients.is_empty() {
        return Ok(());
    }
    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("INSERT INTO email_recipients (id, tenant_id, email_id, kind, address, name) ");
    builder.push_values(recipients, |mut row, (kind, address)| {
        row.push_bind(Uuid::now_v7())
            .push_bind(*ctx.tenant_id.as_uuid())
            .push_bind(email_id)
            .push_bind(kind.as_str())
            .push_bind(address.address.clone())
            .push_bind(address.name.clone());
    });
    builder.build().execute(&mut *conn).await?;
    Ok(())
}

async fn insert_headers<'a>(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    email_id: Uuid,
    headers: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<(), DatabaseError> {
    let headers: Vec<_> = headers.collect();
    if headers.is_empty() {
        return Ok(());
    }
    let mut builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("INSERT INTO email_headers (id, tenant_id, email_id, name, value) ");
    builder.push_values(headers, |mut row, (name, value)| {
        row.push_bind(Uuid::now_v7())
            .push_bind(*ctx.tenant_id.as_uuid())
            .push_bind(email_id)
            .push_bind(name.trim().to_string())
            .push_bind(value.to_string());
    });
    builder.build().execute(&mut *conn).await?;
    Ok(())
}

/// Inserts a sent message with its recipients and threading headers
pub(crate) async fn insert_sent_on(
    conn: &mut PgConnection,
    ctx: &TenantContext,
    message: &OutgoingMessage,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO emails (id, tenant_id, owner_id, folder, subject, snippet, body_text, body_html, \
         from_address, from_name, message_id, in_reply_to, is_read, sent_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, now())",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .bind(ctx.user_id.as_uuid())
    .bind(Folder::Sent.as_str())
    .bind(&message.subject)
    .bind(message.snippet())
    .bind(message.body_text.as_deref())
    .bind(message.body_html.as_deref())
    .bind(&message.from.address)
    .bind(message.from.name.as_deref())
    .bind(message.message_id.as_deref())
    .bind(message.in_reply_to.as_deref())
    .execute(&mut *conn)
    .await?;

    insert_recipients(conn, ctx, id, message.all_recipients()).await?;

    let headers = [
        ("Message-ID", message.message_id.as_deref()),
        ("In-Reply-To", message.in_reply_to.as_deref()),
    ];
    insert_headers(
        conn,
        ctx,
        id,
        headers.iter().filter_map(|(n, v)| v.map(|v| (*n, v))),
    )
    .await?;

    info!(email_id = %id, recipients = message.recipient_count(), "Sent email stored");
    Ok(id)
}

async fn load_detail(conn: &mut PgConnection, ctx: &TenantContext, id: Uuid) -> Result<EmailDetail, DatabaseError> {
    let email = Repository::<EmailRow>::find_on(conn, ctx, id).await?;

    let headers = sqlx::query_as::<_, EmailHeaderRow>(
        "SELECT id, name, value FROM email_headers WHERE email_id = $1 AND tenant_id = $2 ORDER BY id",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    let recipients = sqlx::query_as::<_, EmailRecipientRow>(
        "SELECT id, kind, address, name FROM email_recipients WHERE email_id = $1 AND tenant_id = $2 ORDER BY id",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    let attachments = sqlx::query_as::<_, EmailAttachmentRow>(
        "SELECT id, filename, content_type, size_bytes, storage_key, created_at \
         FROM email_attachments WHERE email_id = $1 AND tenant_id = $2 ORDER BY id",
    )
    .bind(id)
    .bind(ctx.tenant_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    let previous_folder: Option<String> =
        sqlx::query_scalar("SELECT previous_folder FROM email_trash WHERE email_id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(ctx.tenant_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

    Ok(EmailDetail {
        email,
        previous_folder: previous_folder.and_then(|f| f.parse().ok()),
        headers,
        recipients,
        attachments,
    })
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    #[sqlx(try_from = "String")]
    pub folder: Folder,
    pub subject: String,
    pub snippet: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub from_address: String,
    pub from_name: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table for EmailRow {
    const TABLE: &'static str = "emails";
    const ENTITY: &'static str = "Email";
    const SELECT: &'static str = "t.id, t.tenant_id, t.owner_id, t.folder, t.subject, t.snippet, \
         t.body_text, t.body_html, t.from_address, t.from_name, t.message_id, t.in_reply_to, \
         t.is_read, t.is_starred, t.has_attachments, t.sent_at, t.received_at, \
         t.created_at, t.updated_at";
    const OWNER_COLUMN: Option<&'static str> = Some("owner_id");
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("date", "COALESCE(t.received_at, t.sent_at, t.created_at)"),
        ("subject", "t.subject"),
        ("from_address", "t.from_address"),
        ("received_at", "t.received_at"),
        ("sent_at", "t.sent_at"),
        ("created_at", "t.created_at"),
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::new("folder", "t.folder = lower(?)", ColumnKind::Text),
        Filter::new("is_read", "t.is_read = ?", ColumnKind::Bool),
        Filter::new("is_starred", "t.is_starred = ?", ColumnKind::Bool),
        Filter::new("has_attachments", "t.has_attachments = ?", ColumnKind::Bool),
        Filter::new("from_address", "lower(t.from_address) = lower(?)", ColumnKind::Text),
        Filter::new("message_id", "t.message_id = ?", ColumnKind::Text),
    ];
    const SEARCHABLE: &'static [&'static str] =
        &["t.subject", "t.snippet", "t.from_address", "t.from_name"];
    const DEFAULT_SORT: (&'static str, SortOrder) =
        ("COALESCE(t.received_at, t.sent_at, t.created_at)", SortOrder::Desc);
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailHeaderRow {
    pub id: Uuid,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailRecipientRow {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: RecipientKind,
    pub address: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailAttachmentRow {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// An email with all its parts
#[derive(Debug, Clone, Serialize)]
pub struct EmailDetail {
    #[serde(flatten)]
    pub email: EmailRow,
    /// Folder a trashed email will be restored to
    pub previous_folder: Option<Folder>,
    pub headers: Vec<EmailHeaderRow>,
    pub recipients: Vec<EmailRecipientRow>,
    pub attachments: Vec<EmailAttachmentRow>,
}
