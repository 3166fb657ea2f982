//! Mailbox handlers
//!
//! A mailbox belongs to one user; every query is scoped to the caller.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Page;
use domain_mail::{DraftInput, IncomingEmail};
use infra_db::repositories::{EmailDetail, EmailRow};

use crate::auth::AuthContext;
use crate::delivery;
use crate::dto::mail::*;
use crate::dto::{ApiJson, ApiPath, ListQuery};
use crate::{AppState, error::ApiError};

/// Lists emails; pass `folder=inbox` to browse a single folder
pub async fn list_emails(
    State(state): State<AppState>,
    auth: AuthContext,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<EmailRow>>, ApiError> {
    Ok(Json(state.emails.list(&auth.tenant, &options).await?))
}

/// Gets an email with headers, recipients and attachments
pub async fn get_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<EmailDetail>, ApiError> {
    Ok(Json(state.emails.detail(&auth.tenant, id).await?))
}

/// Composes and sends a message
pub async fn send_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<DraftInput>,
) -> Result<(StatusCode, Json<EmailRow>), ApiError> {
    let email = delivery::send_message(&state, &auth.tenant, request).await?;
    Ok((StatusCode::CREATED, Json(email)))
}

/// Files a received email in the caller's inbox
pub async fn receive_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<IncomingEmail>,
) -> Result<(StatusCode, Json<EmailDetail>), ApiError> {
    let detail = state.emails.ingest(&auth.tenant, &request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn set_flags(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<FlagsRequest>,
) -> Result<Json<EmailRow>, ApiError> {
    let email = state
        .emails
        .set_flags(&auth.tenant, id, request.is_read, request.is_starred)
        .await?;
    Ok(Json(email))
}

/// Moves an email to another folder; use the trash routes for the trash
pub async fn move_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<MoveRequest>,
) -> Result<Json<EmailRow>, ApiError> {
    Ok(Json(state.emails.move_to(&auth.tenant, id, request.folder).await?))
}

pub async fn trash_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<EmailRow>, ApiError> {
    Ok(Json(state.emails.trash(&auth.tenant, id).await?))
}

/// Trashes several emails at once
pub async fn trash_many(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<BulkTrashRequest>,
) -> Result<Json<CountResponse>, ApiError> {
    request.validate()?;
    let count = state.emails.trash_many(&auth.tenant, &request.ids).await?;
    Ok(Json(CountResponse { count }))
}

/// Puts a trashed email back in its previous folder
pub async fn restore_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<EmailRow>, ApiError> {
    Ok(Json(state.emails.restore(&auth.tenant, id).await?))
}

/// Deletes a trashed email permanently
pub async fn purge_email(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.emails.purge(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn empty_trash(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.emails.empty_trash(&auth.tenant).await?;
    Ok(Json(CountResponse { count }))
}
