//! Group routes: create, inspect, update and delete calendar groups.

use axum::{extract::State, http::StatusCode, Extension, Json};
use domain::models::group::{CreateGroupRequest, GroupDetail, UpdateGroupRequest};
use domain::models::{Group, GroupRole};
use domain::store::{GroupChanges, NewGroup};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::GroupAccess;

fn group_detail(group: Group, member_count: i64, your_role: Option<GroupRole>) -> GroupDetail {
    GroupDetail {
        id: group.id,
        name: group.name,
        description: group.description,
        owner_id: group.owner_id,
        privacy: group.privacy,
        member_count,
        created_at: group.created_at,
        updated_at: group.updated_at,
        your_role,
    }
}

/// Create a new group.
///
/// POST /api/v1/groups
///
/// The creator becomes the group owner in the same unit of work.
pub async fn create_group(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupDetail>), ApiError> {
    request.validate()?;

    let (group, owner) = state
        .stores
        .groups
        .create_group(NewGroup {
            name: request.name.trim().to_string(),
            description: request.description,
            owner_id: user_auth.user_id,
            privacy: request.privacy.unwrap_or_default(),
        })
        .await?;

    info!(
        group_id = %group.id,
        group_name = %group.name,
        user_id = %user_auth.user_id,
        privacy = %group.privacy,
        "Group created"
    );

    Ok((
        StatusCode::CREATED,
        Json(group_detail(group, 1, Some(owner.role))),
    ))
}

/// Get group details.
///
/// GET /api/v1/groups/:group_id
///
/// Requires group membership.
pub async fn get_group(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group = state
        .stores
        .groups
        .find_group(access.group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let member_count = state.stores.memberships.count_members(group.id).await?;
    let your_role = state
        .resolver
        .role_in_group(group.id, access.user_id)
        .await?;

    Ok(Json(group_detail(group, member_count, your_role)))
}

/// Update group settings.
///
/// PATCH /api/v1/groups/:group_id
///
/// Requires the owner (or a system administrator).
pub async fn update_group(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
    Json(request): Json<UpdateGroupRequest>,
) -> Result<Json<GroupDetail>, ApiError> {
    request.validate()?;

    if request.name.is_none() && request.description.is_none() && request.privacy.is_none() {
        return Err(ApiError::validation("No fields to update"));
    }

    let group = state
        .stores
        .groups
        .update_group(
            access.group_id,
            GroupChanges {
                name: request.name.map(|name| name.trim().to_string()),
                description: request.description,
                privacy: request.privacy,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    info!(
        group_id = %group.id,
        user_id = %access.user_id,
        privacy = %group.privacy,
        "Group updated"
    );

    let member_count = state.stores.memberships.count_members(group.id).await?;
    let your_role = state
        .resolver
        .role_in_group(group.id, access.user_id)
        .await?;

    Ok(Json(group_detail(group, member_count, your_role)))
}

/// Delete a group with its memberships and invites.
///
/// DELETE /api/v1/groups/:group_id
///
/// Requires the owner (or a system administrator).
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
) -> Result<StatusCode, ApiError> {
    if !state.stores.groups.delete_group(access.group_id).await? {
        return Err(ApiError::NotFound("Group not found".to_string()));
    }

    info!(
        group_id = %access.group_id,
        user_id = %access.user_id,
        "Group deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
