//! Invite routes: creation, listing, public preview and redemption.

use axum::{
    extract::{Path, State},
    http::{Extensions, StatusCode},
    Extension, Json,
};
use chrono::Utc;
use domain::models::invite::{
    CreateInviteResponse, InviteSummary, ListInvitesResponse, PublicInviteInfo,
    RedeemInviteRequest, RedeemInviteResponse,
};
use domain::models::{CreateInviteRequest, InviteState, RedemptionOutcome};
use domain::services::CreateInviteValidation;
use shared::invite_code::{is_well_formed, normalize_code};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::{record_invite_created, record_invite_redemption};
use crate::middleware::trace_id::get_request_id;
use crate::middleware::GroupAccess;

/// Create a new invite for a group.
///
/// POST /api/v1/groups/:group_id/invites
///
/// Requires membership; the group's privacy level decides which roles may
/// actually invite.
pub async fn create_invite(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
    Json(request): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<CreateInviteResponse>), ApiError> {
    let validated = match state
        .invites
        .validate_create_invite(access.user_id, access.group_id, &request, Utc::now())
        .await?
    {
        CreateInviteValidation::Valid(validated) => validated,
        CreateInviteValidation::NotFound => {
            return Err(ApiError::NotFound("Group not found".to_string()))
        }
        CreateInviteValidation::Unauthorized => {
            return Err(ApiError::Forbidden(
                "Your role does not allow creating invites for this group".to_string(),
            ))
        }
        CreateInviteValidation::Invalid(errors) => return Err(errors.into()),
    };

    let invite = state.invites.create_invite(validated).await?;
    record_invite_created(invite.invited_user_id.is_some());

    let invite_url = format!(
        "{}/invites/{}",
        state.config.server.app_base_url.trim_end_matches('/'),
        invite.code
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse {
            id: invite.id,
            group_id: invite.group_id,
            code: invite.code,
            invited_user_id: invite.invited_user_id,
            one_time_use: invite.one_time_use,
            expires_at: invite.expires_at,
            created_by: invite.created_by,
            created_at: invite.created_at,
            invite_url,
        }),
    ))
}

/// List a group's invites with their current state, newest first.
///
/// GET /api/v1/groups/:group_id/invites
///
/// Requires moderator or owner.
pub async fn list_invites(
    State(state): State<AppState>,
    Extension(access): Extension<GroupAccess>,
) -> Result<Json<ListInvitesResponse>, ApiError> {
    let now = Utc::now();
    let data = state
        .stores
        .invites
        .list_invites(access.group_id)
        .await?
        .into_iter()
        .map(|invite| InviteSummary::from_invite(invite, now))
        .collect();

    Ok(Json(ListInvitesResponse { data }))
}

/// Public invite preview.
///
/// GET /api/v1/invites/:code
///
/// No authentication. Reveals the group name and whether the code can still
/// be redeemed, not who it targets.
pub async fn get_invite_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PublicInviteInfo>, ApiError> {
    let code = normalize_code(&code);
    if !is_well_formed(&code) {
        return Err(ApiError::NotFound("Invite not found".to_string()));
    }

    let invite = state
        .stores
        .invites
        .find_invite_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invite not found".to_string()))?;

    let group = state
        .stores
        .groups
        .find_group(invite.group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invite not found".to_string()))?;

    let member_count = state.stores.memberships.count_members(group.id).await?;

    Ok(Json(PublicInviteInfo {
        group_name: group.name,
        member_count,
        targeted: invite.invited_user_id.is_some(),
        expires_at: invite.expires_at,
        is_valid: invite.state_at(Utc::now()) == InviteState::Active,
    }))
}

/// Redeem an invite code and join its group.
///
/// POST /api/v1/invites/redeem
pub async fn redeem_invite(
    State(state): State<AppState>,
    user_auth: UserAuth,
    extensions: Extensions,
    Json(request): Json<RedeemInviteRequest>,
) -> Result<(StatusCode, Json<RedeemInviteResponse>), ApiError> {
    request.validate()?;

    let outcome = state
        .redemption
        .redeem_invite(&request.code, user_auth.user_id)
        .await?;
    record_invite_redemption(&outcome);

    info!(
        request_id = %get_request_id(&extensions),
        user_id = %user_auth.user_id,
        outcome = outcome.as_str(),
        "Invite redemption"
    );

    outcome_response(outcome)
}

/// Map a redemption outcome onto the HTTP surface.
fn outcome_response(
    outcome: RedemptionOutcome,
) -> Result<(StatusCode, Json<RedeemInviteResponse>), ApiError> {
    match outcome {
        RedemptionOutcome::Success(membership) => Ok((
            StatusCode::CREATED,
            Json(RedeemInviteResponse {
                group_id: membership.group_id,
                membership: membership.into(),
            }),
        )),
        RedemptionOutcome::NotFound => Err(ApiError::NotFound("Invite not found".to_string())),
        RedemptionOutcome::Exhausted => {
            Err(ApiError::Gone("Invite has already been used".to_string()))
        }
        RedemptionOutcome::Expired => Err(ApiError::Gone("Invite has expired".to_string())),
        RedemptionOutcome::Unauthorized => Err(ApiError::Forbidden(
            "This invite was issued for another user".to_string(),
        )),
        RedemptionOutcome::AlreadyMember => Err(ApiError::Conflict(
            "You are already a member of this group".to_string(),
        )),
    }
}
