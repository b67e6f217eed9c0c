//! Integration tests for group and membership management.
//!
//! Run with: cargo test --test groups_integration

mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, TestApp};
use domain::models::{GroupRole, PrivacyLevel, User};
use domain::store::NewMembership;
use serde_json::json;
use uuid::Uuid;

async fn add_member(app: &TestApp, group_id: Uuid, user: &User, role: GroupRole) {
    app.stores
        .memberships
        .add_membership(NewMembership {
            group_id,
            user_id: user.id,
            role,
            invite_id: None,
        })
        .await
        .expect("Failed to add member");
}

async fn role_of(app: &TestApp, group_id: Uuid, user: &User) -> Option<GroupRole> {
    app.stores
        .memberships
        .find_membership(group_id, user.id)
        .await
        .unwrap()
        .map(|m| m.role)
}

#[tokio::test]
async fn test_create_group_makes_creator_owner() {
    let app = spawn_app();
    let user = app.create_user().await;
    let token = app.token_for(&user);

    let (status, body) = app
        .post(
            "/api/v1/groups",
            Some(&token),
            json!({ "name": "  Climbing  ", "description": "Weekend trips", "privacy": "open" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Climbing");
    assert_eq!(body["privacy"], "open");
    assert_eq!(body["member_count"], 1);
    assert_eq!(body["your_role"], "owner");
    assert_eq!(body["owner_id"], user.id.to_string());

    let group_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    let (status, detail) = app
        .get(&format!("/api/v1/groups/{}", group_id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["your_role"], "owner");
}

#[tokio::test]
async fn test_create_group_defaults_and_validation() {
    let app = spawn_app();
    let user = app.create_user().await;
    let token = app.token_for(&user);

    let (status, body) = app
        .post("/api/v1/groups", Some(&token), json!({ "name": "Chess" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["privacy"], "moderator_invite");

    let (status, body) = app
        .post("/api/v1/groups", Some(&token), json!({ "name": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "name");

    let (status, _) = app
        .post("/api/v1/groups", None, json!({ "name": "Chess" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_group_requires_changes() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/groups/{}", group.id),
            Some(&app.token_for(&owner)),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_group_cascades() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let member = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;
    add_member(&app, group.id, &member, GroupRole::Member).await;

    let (status, _) = app
        .delete(
            &format!("/api/v1/groups/{}", group.id),
            Some(&app.token_for(&member)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(
            &format!("/api/v1/groups/{}", group.id),
            Some(&app.token_for(&owner)),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(role_of(&app, group.id, &member).await, None);

    let (status, _) = app
        .get(
            &format!("/api/v1/groups/{}", group.id),
            Some(&app.token_for(&owner)),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_members_puts_owner_first() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let member = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;
    add_member(&app, group.id, &member, GroupRole::Member).await;

    let (status, body) = app
        .get(
            &format!("/api/v1/groups/{}/members", group.id),
            Some(&app.token_for(&member)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["role"], "owner");
    assert_eq!(body["data"][0]["user_id"], owner.id.to_string());
}

#[tokio::test]
async fn test_add_member_by_username() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let moderator = app.create_user().await;
    let member = app.create_user().await;
    let newcomer = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;
    add_member(&app, group.id, &moderator, GroupRole::Moderator).await;
    add_member(&app, group.id, &member, GroupRole::Member).await;
    let uri = format!("/api/v1/groups/{}/members", group.id);

    let (status, _) = app
        .post(&uri, Some(&app.token_for(&member)), json!({ "username": newcomer.username }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &uri,
            Some(&app.token_for(&moderator)),
            json!({ "username": newcomer.username.to_uppercase() }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "member");
    assert_eq!(body["user_id"], newcomer.id.to_string());

    let (status, _) = app
        .post(&uri, Some(&app.token_for(&moderator)), json!({ "username": newcomer.username }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(&uri, Some(&app.token_for(&moderator)), json!({ "username": "ghost_user" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_member_role() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let member = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;
    add_member(&app, group.id, &member, GroupRole::Member).await;
    let token = app.token_for(&owner);
    let member_uri = format!("/api/v1/groups/{}/members/{}/role", group.id, member.id);

    let (status, body) = app
        .send(Method::PUT, &member_uri, Some(&token), Some(json!({ "role": "moderator" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "moderator");
    assert_eq!(role_of(&app, group.id, &member).await, Some(GroupRole::Moderator));

    // Moderators cannot manage roles.
    let (status, _) = app
        .send(
            Method::PUT,
            &member_uri,
            Some(&app.token_for(&member)),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::PUT, &member_uri, Some(&token), Some(json!({ "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let owner_uri = format!("/api/v1/groups/{}/members/{}/role", group.id, owner.id);
    let (status, _) = app
        .send(Method::PUT, &owner_uri, Some(&token), Some(json!({ "role": "member" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(role_of(&app, group.id, &owner).await, Some(GroupRole::Owner));

    let missing_uri = format!("/api/v1/groups/{}/members/{}/role", group.id, Uuid::new_v4());
    let (status, _) = app
        .send(Method::PUT, &missing_uri, Some(&token), Some(json!({ "role": "member" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_member_requires_higher_role() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let moderator = app.create_user().await;
    let other_moderator = app.create_user().await;
    let member = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;
    add_member(&app, group.id, &moderator, GroupRole::Moderator).await;
    add_member(&app, group.id, &other_moderator, GroupRole::Moderator).await;
    add_member(&app, group.id, &member, GroupRole::Member).await;
    let uri = |user: &User| format!("/api/v1/groups/{}/members/{}", group.id, user.id);

    let (status, _) = app
        .delete(&uri(&other_moderator), Some(&app.token_for(&moderator)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&uri(&owner), Some(&app.token_for(&moderator)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&uri(&member), Some(&app.token_for(&moderator)))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(role_of(&app, group.id, &member).await, None);

    let (status, _) = app
        .delete(&uri(&other_moderator), Some(&app.token_for(&owner)))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete(&uri(&member), Some(&app.token_for(&owner)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leave_group() {
    let app = spawn_app();
    let owner = app.create_user().await;
    let member = app.create_user().await;
    let group = app.create_group(&owner, PrivacyLevel::Open).await;
    add_member(&app, group.id, &member, GroupRole::Member).await;
    let uri = format!("/api/v1/groups/{}/leave", group.id);

    let (status, _) = app.post(&uri, Some(&app.token_for(&owner)), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post(&uri, Some(&app.token_for(&member)), json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(role_of(&app, group.id, &member).await, None);

    // Gone from the group, so the member gate now refuses.
    let (status, _) = app.post(&uri, Some(&app.token_for(&member)), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = spawn_app();

    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["backend"], "in_memory");

    let (status, body) = app.get("/api/health/live", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}
