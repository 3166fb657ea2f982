//! Household handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use core_kernel::Page;
use domain_contacts::{ContactValidator, HouseholdInput, TagTarget};
use infra_db::repositories::{HouseholdRow, PersonRow, TagRow};

use crate::auth::AuthContext;
use crate::dto::{ApiJson, ApiPath, ListQuery};
use crate::{AppState, error::ApiError};

fn validated(input: HouseholdInput) -> Result<HouseholdInput, ApiError> {
    let input = input.normalized();
    ContactValidator::validate_household(&input).into_result()?;
    Ok(input)
}

pub async fn create_household(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(request): ApiJson<HouseholdInput>,
) -> Result<(StatusCode, Json<HouseholdRow>), ApiError> {
    let input = validated(request)?;
    let household = state.households.create(&auth.tenant, &input).await?;
    Ok((StatusCode::CREATED, Json(household)))
}

pub async fn list_households(
    State(state): State<AppState>,
    auth: AuthContext,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<HouseholdRow>>, ApiError> {
    Ok(Json(state.households.list(&auth.tenant, &options).await?))
}

pub async fn get_household(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<HouseholdRow>, ApiError> {
    Ok(Json(state.households.get(&auth.tenant, id).await?))
}

pub async fn update_household(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<HouseholdInput>,
) -> Result<Json<HouseholdRow>, ApiError> {
    let input = validated(request)?;
    Ok(Json(state.households.update(&auth.tenant, id, &input).await?))
}

/// Deletes a household; its members stay, without a household
pub async fn delete_household(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.households.delete(&auth.tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ListQuery(options): ListQuery,
) -> Result<Json<Page<PersonRow>>, ApiError> {
    Ok(Json(state.households.members(&auth.tenant, id, options).await?))
}

/// Moves a person into the household
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((id, person_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<PersonRow>, ApiError> {
    Ok(Json(state.households.add_member(&auth.tenant, id, person_id).await?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((id, person_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.households.remove_member(&auth.tenant, id, person_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_household_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<TagRow>>, ApiError> {
    Ok(Json(state.tags.tags_of(&auth.tenant, TagTarget::Household, id).await?))
}

pub async fn tag_household(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((id, tag_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.tags.tag(&auth.tenant, TagTarget::Household, id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn untag_household(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((id, tag_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.tags.untag(&auth.tenant, TagTarget::Household, id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
