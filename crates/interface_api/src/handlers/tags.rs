//! Tag handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use core_kernel::Page;
use domain_contacts::TagInput;
use infra_db::repositories::{PersonRow, TagRow};

use crate::auth::AuthContext;
use crate::dto::{ApiJson, ApiPath, ListQuery};
use crate::{AppState, error::ApiError};

fn validated(input: TagInput) -> Result<TagInput, ApiError> {
    let input = input.normalized();
    input.validate()?;
    Ok(input)
}

pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<TagInput>,
) -> Result<(StatusCode, Json<TagRow>), ApiError> {
    let input = validated(request)?;
    let tag = state.tags.create(&auth.tenant, &input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn list_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<TagRow>>, ApiError> {
    Ok(Json(state.tags.list(&auth.tenant, &options).await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<TagRow>, ApiError> {
    Ok(Json(state.tags.get(&auth.tenant, id).await?))
}

pub async fn update_tag(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<TagInput>,
) -> Result<Json<TagRow>, ApiError> {
    let input = validated(request)?;
    Ok(Json(state.tags.update(&auth.tenant, id, &input).await?))
}

/// Deletes a tag and detaches it everywhere
pub async fn delete_tag(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.tags.delete(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tagged_persons(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<PersonRow>>, ApiError> {
    Ok(Json(state.tags.persons_with_tag(&auth.tenant, id, options).await?))
}
