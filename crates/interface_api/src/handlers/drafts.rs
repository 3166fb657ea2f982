//! Draft handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use core_kernel::Page;
use domain_mail::DraftInput;
use infra_db::repositories::{DraftRow, EmailRow};

use crate::auth::AuthContext;
use crate::delivery;
use crate::dto::{ApiJson, ApiPath, ListQuery};
use crate::{AppState, error::ApiError};

pub async fn create_draft(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<DraftInput>,
) -> Result<(StatusCode, Json<DraftRow>), ApiError> {
    let input = request.normalized()?;
    let draft = state.drafts.create(&auth.tenant, &input).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

pub async fn list_drafts(
    State(state): State<AppState>,
    auth: AuthContext,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<DraftRow>>, ApiError> {
    Ok(Json(state.drafts.list(&auth.tenant, &options).await?))
}

pub async fn get_draft(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DraftRow>, ApiError> {
    Ok(Json(state.drafts.get(&auth.tenant, id).await?))
}

/// Replaces the draft's content
pub async fn update_draft(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<DraftInput>,
) -> Result<Json<DraftRow>, ApiError> {
    let input = request.normalized()?;
    Ok(Json(state.drafts.update(&auth.tenant, id, &input).await?))
}

pub async fn delete_draft(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.drafts.delete(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sends the draft and files it under `sent`
pub async fn send_draft(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<EmailRow>), ApiError> {
    let email = delivery::send_draft(&state, &auth.tenant, id).await?;
    Ok((StatusCode::CREATED, Json(email)))
}
