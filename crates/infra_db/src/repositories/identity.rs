//! Identity repository
//!
//! Tenants, auth users, profiles and sessions. Sign-up and member invites
//! write several tables and run in a single transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use core_kernel::TenantContext;
use domain_identity::{display_name, NewMember, ProfileUpdate, Role, ValidatedSignUp};

use crate::error::DatabaseError;

const USER_COLUMNS: &str =
    "id, tenant_id, email, password_hash, role, is_active, last_sign_in_at, created_at, updated_at";
const PROFILE_COLUMNS: &str = "id, tenant_id, user_id, first_name, last_name, display_name, \
     avatar_url, timezone, signature, created_at, updated_at";
const SESSION_COLUMNS: &str =
    "id, tenant_id, user_id, user_agent, ip_address, expires_at, created_at, updated_at";

/// Repository for tenants, users, profiles and sessions
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    pool: PgPool,
}

impl IdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates tenant, owner, profile and first session in one transaction
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` when the tenant slug or the email is taken
    pub async fn sign_up(
        &self,
        sign_up: &ValidatedSignUp,
        password_hash: &str,
        session: NewSession,
    ) -> Result<SignUpRecords, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let tenant = sqlx::query_as::<_, TenantRow>(
            "INSERT INTO tenants (id, name, slug, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             RETURNING id, name, slug, created_at, updated_at",
        )
        .bind(*sign_up.tenant.id.as_uuid())
        .bind(&sign_up.tenant.name)
        .bind(&sign_up.tenant.slug)
        .bind(sign_up.tenant.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::duplicate("Organization", "slug", &sign_up.tenant.slug)
            }
            other => other,
        })?;

        let user = insert_user(&mut tx, tenant.id, &sign_up.email, password_hash, Role::Owner).await?;
        let profile = insert_profile(
            &mut tx,
            tenant.id,
            user.id,
            &sign_up.first_name,
            &sign_up.last_name,
        )
        .await?;
        let session = insert_session(&mut tx, tenant.id, user.id, &session).await?;

        tx.commit().await?;
        info!(tenant_id = %tenant.id, user_id = %user.id, "Tenant signed up");

        Ok(SignUpRecords {
            tenant,
            user,
            profile,
            session,
        })
    }

    /// Looks a user up by email across all tenants
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>, DatabaseError> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM authusers WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Records the sign-in and opens a session
    pub async fn start_session(
        &self,
        user: &UserRow,
        session: NewSession,
    ) -> Result<SessionRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE authusers SET last_sign_in_at = now(), updated_at = now() WHERE id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        let session = insert_session(&mut tx, user.tenant_id, user.id, &session).await?;

        tx.commit().await?;
        debug!(user_id = %user.id, session_id = %session.id, "Session started");
        Ok(session)
    }

    /// A session of `user_id` that has not expired at `now`
    pub async fn find_active_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRow>, DatabaseError> {
        let session = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM sessions WHERE id = $1 AND user_id = $2 AND expires_at > $3",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Deletes one of the caller's sessions
    pub async fn end_session(&self, ctx: &TenantContext, session_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND tenant_id = $2 AND user_id = $3")
            .bind(session_id)
            .bind(ctx.tenant_id.as_uuid())
            .bind(ctx.user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Session", session_id));
        }
        Ok(())
    }

    /// Live sessions of the caller, newest first
    pub async fn list_sessions(&self, ctx: &TenantContext) -> Result<Vec<SessionRow>, DatabaseError> {
        let sessions = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM sessions \
             WHERE tenant_id = $1 AND user_id = $2 AND expires_at > now() \
             ORDER BY created_at DESC",
            SESSION_COLUMNS
        ))
        .bind(ctx.tenant_id.as_uuid())
        .bind(ctx.user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Removes every session that expired before `now`
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_tenant(&self, ctx: &TenantContext) -> Result<TenantRow, DatabaseError> {
        sqlx::query_as::<_, TenantRow>(
            "SELECT id, name, slug, created_at, updated_at FROM tenants WHERE id = $1",
        )
        .bind(ctx.tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Tenant", ctx.tenant_id))
    }

    /// The calling user
    pub async fn get_user(&self, ctx: &TenantContext) -> Result<UserRow, DatabaseError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM authusers WHERE id = $1 AND tenant_id = $2",
            USER_COLUMNS
        ))
        .bind(ctx.user_id.as_uuid())
        .bind(ctx.tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", ctx.user_id))
    }

    /// Profile of the calling user
    pub async fn get_profile(&self, ctx: &TenantContext) -> Result<ProfileRow, DatabaseError> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1 AND tenant_id = $2",
            PROFILE_COLUMNS
        ))
        .bind(ctx.user_id.as_uuid())
        .bind(ctx.tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Profile", ctx.user_id))
    }

    /// Applies the fields present in `update`; absent fields are kept
    pub async fn update_profile(
        &self,
        ctx: &TenantContext,
        update: &ProfileUpdate,
    ) -> Result<ProfileRow, DatabaseError> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET \
                 first_name = COALESCE($3, first_name), \
                 last_name = COALESCE($4, last_name), \
                 display_name = COALESCE($5, display_name), \
                 avatar_url = COALESCE($6, avatar_url), \
                 timezone = COALESCE($7, timezone), \
                 signature = COALESCE($8, signature), \
                 updated_at = now() \
             WHERE user_id = $1 AND tenant_id = $2 \
             RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(ctx.user_id.as_uuid())
        .bind(ctx.tenant_id.as_uuid())
        .bind(update.first_name.as_deref().map(str::trim))
        .bind(update.last_name.as_deref().map(str::trim))
        .bind(update.display_name.as_deref().map(str::trim))
        .bind(update.avatar_url.as_deref())
        .bind(update.timezone.as_deref())
        .bind(update.signature.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Profile", ctx.user_id))
    }

    /// Creates a user and profile inside the caller's tenant
    pub async fn add_member(
        &self,
        ctx: &TenantContext,
        email: &str,
        password_hash: &str,
        member: &NewMember,
    ) -> Result<(UserRow, ProfileRow), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let tenant_id = *ctx.tenant_id.as_uuid();

        let user = insert_user(&mut tx, tenant_id, email, password_hash, member.role).await?;
        let profile = insert_profile(
            &mut tx,
            tenant_id,
            user.id,
            member.first_name.trim(),
            member.last_name.trim(),
        )
        .await?;

        tx.commit().await?;
        info!(tenant_id = %tenant_id, user_id = %user.id, role = %member.role, "Member added");
        Ok((user, profile))
    }
}

async fn insert_user(
    conn: &mut sqlx::PgConnection,
    tenant_id: Uuid,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<UserRow, DatabaseError> {
    sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO authusers (id, tenant_id, email, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(Uuid::now_v7())
    .bind(tenant_id)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match DatabaseError::from(e) {
        DatabaseError::DuplicateEntry(_) => DatabaseError::duplicate("User", "email", email),
        other => other,
    })
}

async fn insert_profile(
    conn: &mut sqlx::PgConnection,
    tenant_id: Uuid,
    user_id: Uuid,
    first_name: &str,
    last_name: &str,
) -> Result<ProfileRow, DatabaseError> {
    let profile = sqlx::query_as::<_, ProfileRow>(&format!(
        "INSERT INTO profiles (id, tenant_id, user_id, first_name, last_name, display_name) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        PROFILE_COLUMNS
    ))
    .bind(Uuid::now_v7())
    .bind(tenant_id)
    .bind(user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(display_name(first_name, last_name))
    .fetch_one(&mut *conn)
    .await?;
    Ok(profile)
}

async fn insert_session(
    conn: &mut sqlx::PgConnection,
    tenant_id: Uuid,
    user_id: Uuid,
    session: &NewSession,
) -> Result<SessionRow, DatabaseError> {
    let session = sqlx::query_as::<_, SessionRow>(&format!(
        "INSERT INTO sessions (id, tenant_id, user_id, user_agent, ip_address, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        SESSION_COLUMNS
    ))
    .bind(Uuid::now_v7())
    .bind(tenant_id)
    .bind(user_id)
    .bind(session.user_agent.as_deref())
    .bind(session.ip_address.as_deref())
    .bind(session.expires_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(session)
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub timezone: String,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client details recorded with a new session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Everything a sign-up creates
#[derive(Debug, Clone)]
pub struct SignUpRecords {
    pub tenant: TenantRow,
    pub user: UserRow,
    pub profile: ProfileRow,
    pub session: SessionRow,
}
