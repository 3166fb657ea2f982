//! Newsletter handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::Page;
use domain_identity::Role;
use domain_mail::NewsletterInput;
use infra_db::repositories::NewsletterRow;

use crate::auth::AuthContext;
use crate::delivery;
use crate::dto::mail::{NewsletterSendResponse, ScheduleRequest};
use crate::dto::{ApiJson, ApiPath, ListQuery};
use crate::{AppState, error::ApiError};

pub async fn create_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<NewsletterInput>,
) -> Result<(StatusCode, Json<NewsletterRow>), ApiError> {
    request.validate()?;
    let newsletter = state.newsletters.create(&auth.tenant, &request).await?;
    Ok((StatusCode::CREATED, Json(newsletter)))
}

/// Lists newsletters; supports `status`, `audience_tag_id` and `author_id`
/// filters
pub async fn list_newsletters(
    State(state): State<AppState>,
    auth: AuthContext,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<NewsletterRow>>, ApiError> {
    Ok(Json(state.newsletters.list(&auth.tenant, &options).await?))
}

pub async fn get_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NewsletterRow>, ApiError> {
    Ok(Json(state.newsletters.get(&auth.tenant, id).await?))
}

/// Replaces the content of a draft newsletter
pub async fn update_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<NewsletterInput>,
) -> Result<Json<NewsletterRow>, ApiError> {
    request.validate()?;
    Ok(Json(state.newsletters.update(&auth.tenant, id, &request).await?))
}

pub async fn delete_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.newsletters.delete(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn schedule_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<Json<NewsletterRow>, ApiError> {
    let newsletter = state
        .newsletters
        .schedule(&auth.tenant, id, request.scheduled_for, Utc::now())
        .await?;
    Ok(Json(newsletter))
}

pub async fn unschedule_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NewsletterRow>, ApiError> {
    Ok(Json(state.newsletters.unschedule(&auth.tenant, id).await?))
}

/// Sends the newsletter now; owners and admins only
pub async fn send_newsletter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NewsletterSendResponse>, ApiError> {
    auth.require(Role::can_send_newsletters, "Sending newsletters")?;
    let outcome = delivery::send_newsletter(&state, &auth.tenant, id).await?;
    Ok(Json(NewsletterSendResponse {
        newsletter: outcome.newsletter,
        delivered: outcome.delivered,
        failed: outcome.failed,
    }))
}
