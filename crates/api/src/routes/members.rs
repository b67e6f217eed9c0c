//! Membership routes: listing, direct adds, role changes and departures.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::group::{
    AddMemberRequest, ListMembersResponse, MemberResponse, UpdateRoleRequest, UpdateRoleResponse,
};
use domain::models::GroupRole;
use domain::store::{NewMembership, StoreError};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::GroupAccess;

/// List group members, owner first.
///
/// GET /api/v1/groups/:group_id/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
) -> Result<Json<ListMembersResponse>, ApiError> {
    let data: Vec<MemberResponse> = state
        .stores
        .memberships
        .list_memberships(access.group_id)
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect();

    Ok(Json(ListMembersResponse {
        count: data.len(),
        data,
    }))
}

/// Add a user to the group as a Member without an invite.
///
/// POST /api/v1/groups/:group_id/members
///
/// Requires moderator or owner.
pub async fn add_member(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), ApiError> {
    request.validate()?;

    let user = state
        .stores
        .users
        .find_user_by_username(request.username.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let membership = state
        .stores
        .memberships
        .add_membership(NewMembership {
            group_id: access.group_id,
            user_id: user.id,
            role: GroupRole::Member,
            invite_id: None,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation { .. } => {
                ApiError::Conflict("User is already a member of this group".to_string())
            }
            other => other.into(),
        })?;

    info!(
        group_id = %access.group_id,
        user_id = %user.id,
        added_by = %access.user_id,
        "Member added"
    );

    Ok((StatusCode::CREATED, Json(membership.into())))
}

/// Promote or demote a member between Member and Moderator.
///
/// PUT /api/v1/groups/:group_id/members/:user_id/role
///
/// Requires the owner (or a system administrator). The owner's own role is
/// never changed here and nobody is promoted to Owner.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
    Path((_, user_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<UpdateRoleResponse>, ApiError> {
    if !request.role.is_assignable() {
        return Err(ApiError::validation(
            "Ownership cannot be assigned through role management",
        ));
    }

    let target = state
        .stores
        .memberships
        .find_membership(access.group_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    if target.role == GroupRole::Owner {
        return Err(ApiError::Forbidden(
            "The owner's role cannot be changed".to_string(),
        ));
    }

    let updated = state
        .stores
        .memberships
        .update_membership_role(access.group_id, user_id, request.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    info!(
        group_id = %access.group_id,
        user_id = %user_id,
        from = %target.role,
        to = %updated.role,
        changed_by = %access.user_id,
        "Member role updated"
    );

    Ok(Json(UpdateRoleResponse {
        user_id: updated.user_id,
        group_id: updated.group_id,
        role: updated.role,
        updated_at: updated.updated_at,
    }))
}

/// Remove a member whose role is strictly lower than the caller's.
///
/// DELETE /api/v1/groups/:group_id/members/:user_id
///
/// Requires moderator or owner.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
    Path((_, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let target = state
        .stores
        .memberships
        .find_membership(access.group_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    if target.role == GroupRole::Owner {
        return Err(ApiError::Forbidden(
            "The group owner cannot be removed".to_string(),
        ));
    }

    let caller_role = state
        .resolver
        .role_in_group(access.group_id, access.user_id)
        .await?;
    if !caller_role.is_some_and(|role| role > target.role) {
        return Err(ApiError::Forbidden(
            "You can only remove members with a lower role than yours".to_string(),
        ));
    }

    if !state
        .stores
        .memberships
        .remove_membership(access.group_id, user_id)
        .await?
    {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    info!(
        group_id = %access.group_id,
        user_id = %user_id,
        removed_by = %access.user_id,
        "Member removed"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Leave a group.
///
/// POST /api/v1/groups/:group_id/leave
///
/// The owner cannot leave; the group must be deleted instead.
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
) -> Result<StatusCode, ApiError> {
    let role = state
        .resolver
        .role_in_group(access.group_id, access.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    if role == GroupRole::Owner {
        return Err(ApiError::Forbidden(
            "The owner cannot leave the group".to_string(),
        ));
    }

    state
        .stores
        .memberships
        .remove_membership(access.group_id, access.user_id)
        .await?;

    info!(
        group_id = %access.group_id,
        user_id = %access.user_id,
        "Member left group"
    );

    Ok(StatusCode::NO_CONTENT)
}
