//! Person handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use core_kernel::Page;
use domain_contacts::{ContactValidator, PersonInput, TagTarget};
use infra_db::repositories::{PersonRow, TagRow};

use crate::auth::AuthContext;
use crate::dto::{ApiJson, ApiPath, ListQuery};
use crate::{AppState, error::ApiError};

fn validated(input: PersonInput) -> Result<PersonInput, ApiError> {
    let input = input.normalized();
    ContactValidator::validate_person(&input).into_result()?;
    Ok(input)
}

/// Creates a person
pub async fn create_person(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<PersonInput>,
) -> Result<(StatusCode, Json<PersonRow>), ApiError> {
    let input = validated(request)?;
    let person = state.persons.create(&auth.tenant, &input).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

/// Lists persons; supports `household_id` and `tag_id` filters
pub async fn list_persons(
    State(state): State<AppState>,
    auth: AuthContext,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<PersonRow>>, ApiError> {
    Ok(Json(state.persons.list(&auth.tenant, &options).await?))
}

/// Gets a person by ID
pub async fn get_person(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PersonRow>, ApiError> {
    Ok(Json(state.persons.get(&auth.tenant, id).await?))
}

/// Replaces a person's fields
pub async fn update_person(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<PersonInput>,
) -> Result<Json<PersonRow>, ApiError> {
    let input = validated(request)?;
    Ok(Json(state.persons.update(&auth.tenant, id, &input).await?))
}

pub async fn delete_person(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.persons.delete(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_person_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<TagRow>>, ApiError> {
    Ok(Json(state.tags.tags_of(&auth.tenant, TagTarget::Person, id).await?))
}

/// Attaches a tag; tagging twice succeeds
pub async fn tag_person(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((id, tag_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.tags.tag(&auth.tenant, TagTarget::Person, id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn untag_person(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((id, tag_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.tags.untag(&auth.tenant, TagTarget::Person, id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
