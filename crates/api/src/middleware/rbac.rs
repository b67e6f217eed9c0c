//! Group authorization gates.
//!
//! Each gate evaluates a [`GroupPolicy`] for the authenticated caller
//! against the `group_id` route parameter. Gates must run after
//! `require_user_auth`; a missing `UserAuth` is treated as unauthenticated.

use axum::{
    body::Body,
    extract::{RawPathParams, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::services::{GroupPolicy, PolicyOutcome};
use std::collections::HashMap;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::{unauthorized_response, UserAuth};

/// Group access granted by a gate, passed to handlers via request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupAccess {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

/// Requires the caller to be a member of the group (any role).
pub async fn require_group_member(
    State(state): State<AppState>,
    params: RawPathParams,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(GroupPolicy::member(), state, params, req, next).await
}

/// Requires the caller to be a moderator or the owner of the group.
pub async fn require_group_moderator(
    State(state): State<AppState>,
    params: RawPathParams,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(GroupPolicy::moderator(), state, params, req, next).await
}

/// Requires the caller to own the group or be a system administrator.
pub async fn require_group_owner(
    State(state): State<AppState>,
    params: RawPathParams,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(GroupPolicy::owner(), state, params, req, next).await
}

async fn enforce(
    policy: GroupPolicy,
    state: AppState,
    params: RawPathParams,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let params: HashMap<String, String> = params
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let principal = req.extensions().get::<UserAuth>().map(UserAuth::principal);

    let outcome = match policy
        .check(&state.resolver, principal.as_ref(), &params)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Failed to evaluate group policy");
            return ApiError::Internal("Failed to verify group access".into()).into_response();
        }
    };

    match outcome {
        PolicyOutcome::Allow { group_id, user_id } => {
            req.extensions_mut().insert(GroupAccess { group_id, user_id });
            next.run(req).await
        }
        PolicyOutcome::Challenge => unauthorized_response("Authentication required"),
        PolicyOutcome::NotFound => ApiError::NotFound("Group not found".into()).into_response(),
        PolicyOutcome::Forbidden => ApiError::Forbidden(format!(
            "Insufficient permissions. Required role: {} or higher",
            policy.required_role()
        ))
        .into_response(),
    }
}
