//! Account handlers: sign-up, sign-in, sessions, profile and members

use axum::{extract::State, http::{header::USER_AGENT, HeaderMap, StatusCode}, Json};
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{TenantContext, TenantId, UserId};
use domain_identity::{
    hash_password, verify_sign_in, IdentityError, NewMember, ProfileUpdate, Role, SignIn, SignUp,
};
use infra_db::repositories::{NewSession, ProfileRow, SessionRow, UserRow};

use crate::auth::{create_token, AuthContext};
use crate::dto::auth::*;
use crate::dto::{ApiJson, ApiPath};
use crate::{AppState, error::ApiError};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client details recorded with a new session
fn new_session(state: &AppState, headers: &HeaderMap) -> NewSession {
    NewSession {
        user_agent: header(headers, USER_AGENT.as_str()).map(|ua| ua.chars().take(512).collect()),
        ip_address: header(headers, "x-forwarded-for")
            .and_then(|list| list.split(',').next())
            .map(|ip| ip.trim().to_string()),
        expires_at: state.sessions.expires_at(Utc::now()),
    }
}

/// Signs a token for a freshly opened session
fn issue(state: &AppState, user: &UserRow, session: &SessionRow) -> Result<(String, chrono::DateTime<Utc>), ApiError> {
    let token = create_token(
        user.id,
        user.tenant_id,
        session.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_secs,
    )?;
    let token_expiry = Utc::now() + Duration::seconds(state.config.jwt_expiration_secs as i64);
    Ok((token, token_expiry.min(session.expires_at)))
}

/// Creates an organization with its owner and signs the owner in
pub async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;
    let sign_up = SignUp::from(request).validate()?;
    let password_hash = hash_password(&sign_up.password)?;

    let records = state
        .identity
        .sign_up(&sign_up, &password_hash, new_session(&state, &headers))
        .await?;
    let (token, expires_at) = issue(&state, &records.user, &records.session)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            expires_at,
            tenant: records.tenant,
            user: records.user,
            profile: records.profile,
        }),
    ))
}

/// Exchanges email and password for a token.
///
/// An unknown email and a wrong password fail the same way.
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SignInRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    request.validate()?;
    let sign_in = SignIn::from(request);
    let email = sign_in.lookup_email()?;

    let user = state.identity.find_user_by_email(&email).await?;
    let verified = verify_sign_in(&sign_in.password, user.as_ref().map(|u| u.password_hash.as_str()));
    let user = match user {
        Some(user) if verified => user,
        _ => return Err(IdentityError::InvalidCredentials.into()),
    };
    if !user.is_active {
        return Err(IdentityError::InactiveUser.into());
    }

    let session = state.identity.start_session(&user, new_session(&state, &headers)).await?;
    let (token, expires_at) = issue(&state, &user, &session)?;

    let ctx = TenantContext::new(TenantId::from_uuid(user.tenant_id), UserId::from_uuid(user.id));
    let tenant = state.identity.get_tenant(&ctx).await?;
    let profile = state.identity.get_profile(&ctx).await?;
    info!(user_id = %user.id, tenant_id = %user.tenant_id, "User signed in");

    Ok(Json(AuthResponse {
        token,
        expires_at,
        tenant,
        user,
        profile,
    }))
}

/// Ends the session the request was made with
pub async fn sign_out(State(state): State<AppState>, auth: AuthContext) -> Result<StatusCode, ApiError> {
    state.identity.end_session(&auth.tenant, auth.session_id).await?;
    info!(user_id = %auth.user_id(), "User signed out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, auth: AuthContext) -> Result<Json<MeResponse>, ApiError> {
    Ok(Json(MeResponse {
        tenant: state.identity.get_tenant(&auth.tenant).await?,
        user: state.identity.get_user(&auth.tenant).await?,
        profile: state.identity.get_profile(&auth.tenant).await?,
        session_id: auth.session_id,
    }))
}

/// Applies a partial profile update
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<ProfileRow>, ApiError> {
    update.validate()?;
    if update.is_empty() {
        return Ok(Json(state.identity.get_profile(&auth.tenant).await?));
    }
    Ok(Json(state.identity.update_profile(&auth.tenant, &update).await?))
}

/// Live sessions of the caller
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state
        .identity
        .list_sessions(&auth.tenant)
        .await?
        .into_iter()
        .map(|session| SessionResponse {
            current: session.id == auth.session_id,
            session,
        })
        .collect();
    Ok(Json(sessions))
}

/// Signs one of the caller's sessions out
pub async fn revoke_session(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.identity.end_session(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a user to the caller's organization
pub async fn invite_member(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<InviteMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), ApiError> {
    auth.require(Role::can_invite, "Inviting members")?;
    request.validate()?;
    let member = NewMember::from(request);
    let email = member.validate()?;
    let password_hash = hash_password(&member.password)?;

    let (user, profile) = state
        .identity
        .add_member(&auth.tenant, &email, &password_hash, &member)
        .await?;
    info!(user_id = %user.id, role = %user.role, invited_by = %auth.user_id(), "Member added");
    Ok((StatusCode::CREATED, Json(MemberResponse { user, profile })))
}
