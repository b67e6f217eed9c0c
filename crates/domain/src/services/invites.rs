//! Invite manager: code generation, creation rules and persistence.

use chrono::{DateTime, Utc};
use shared::invite_code::{generate_code, normalize_code, DEFAULT_INVITE_CODE_LENGTH};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{CreateInviteRequest, Invite};
use crate::store::{
    GroupStore, InviteStore, MembershipStore, NewInvite, StoreError, Stores, UserStore,
    INVITE_CODE_UNIQUE_CONSTRAINT,
};

/// Default bound on code generation attempts.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 10;

#[derive(Debug, Error)]
pub enum InviteError {
    /// Every generated code collided with an existing one. The configured
    /// code length is too small for the number of invites.
    #[error("No unique invite code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tunables for code generation.
#[derive(Debug, Clone, Copy)]
pub struct InviteSettings {
    pub code_length: usize,
    pub max_code_attempts: u32,
}

impl Default for InviteSettings {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_INVITE_CODE_LENGTH,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }
}

/// An invite that passed every creation rule and is ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInvite {
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub invited_user_id: Option<Uuid>,
    pub one_time_use: bool,
    /// The instant the creation rules were checked at; stored as the
    /// invite's creation time.
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of the invite creation rules.
#[derive(Debug)]
pub enum CreateInviteValidation {
    Valid(ValidatedInvite),
    NotFound,
    /// The creator's role does not satisfy the group's privacy level.
    Unauthorized,
    /// Field-level problems, keyed by request field.
    Invalid(ValidationErrors),
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Creates invites for groups.
#[derive(Clone)]
pub struct InviteManager {
    users: Arc<dyn UserStore>,
    groups: Arc<dyn GroupStore>,
    memberships: Arc<dyn MembershipStore>,
    invites: Arc<dyn InviteStore>,
    settings: InviteSettings,
}

impl InviteManager {
    pub fn new(stores: &Stores, settings: InviteSettings) -> Self {
        Self {
            users: stores.users.clone(),
            groups: stores.groups.clone(),
            memberships: stores.memberships.clone(),
            invites: stores.invites.clone(),
            settings,
        }
    }

    /// Generate a random code of `length` characters that no existing
    /// invite uses.
    pub async fn generate_unique_code(&self, length: usize) -> Result<String, InviteError> {
        self.generate_unique_code_with(|| generate_code(length))
            .await
    }

    /// Generate a unique code, drawing candidates from `generator`.
    pub async fn generate_unique_code_with<F>(&self, generator: F) -> Result<String, InviteError>
    where
        F: Fn() -> String + Send,
    {
        let attempts = self.settings.max_code_attempts;
        for attempt in 1..=attempts {
            let code = normalize_code(&generator());
            if !self.invites.code_exists(&code).await? {
                return Ok(code);
            }
            tracing::debug!(attempt, "invite code collision, retrying");
        }

        tracing::error!(attempts, "invite code space exhausted");
        Err(InviteError::CodeSpaceExhausted { attempts })
    }

    /// Apply the invite creation rules for `creator_id` in `group_id`.
    ///
    /// The creator's role must satisfy the group's privacy level. For
    /// `OwnerInvite` groups that means the literal owner.
    pub async fn validate_create_invite(
        &self,
        creator_id: Uuid,
        group_id: Uuid,
        request: &CreateInviteRequest,
        now: DateTime<Utc>,
    ) -> Result<CreateInviteValidation, StoreError> {
        let Some(group) = self.groups.find_group(group_id).await? else {
            return Ok(CreateInviteValidation::NotFound);
        };

        let role = self
            .memberships
            .find_membership(group_id, creator_id)
            .await?
            .map(|m| m.role);
        let required = group.privacy.min_role_to_invite();
        if !role.is_some_and(|r| r.at_least(required)) {
            tracing::debug!(
                %group_id,
                %creator_id,
                privacy = %group.privacy,
                "invite creation not permitted"
            );
            return Ok(CreateInviteValidation::Unauthorized);
        }

        let mut errors = match request.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let one_time_use = request.one_time_use.unwrap_or(true);
        let mut invited_user_id = None;

        if let Some(username) = request.invited_username.as_deref().map(str::trim) {
            if !errors.field_errors().contains_key("invited_username") {
                match self.users.find_user_by_username(username).await? {
                    None => errors.add(
                        "invited_username",
                        field_error("unknown_user", "No user with that username exists"),
                    ),
                    Some(user) if user.id == creator_id => errors.add(
                        "invited_username",
                        field_error("self_target", "You cannot invite yourself"),
                    ),
                    Some(user) => invited_user_id = Some(user.id),
                }
            }

            if !one_time_use {
                errors.add(
                    "one_time_use",
                    field_error(
                        "targeted_requires_one_time",
                        "An invite for a specific user must be one-time-use",
                    ),
                );
            }
        }

        if request.expires_at.is_some_and(|expires_at| expires_at <= now) {
            errors.add(
                "expires_at",
                field_error("expiry_not_in_future", "Expiry must be in the future"),
            );
        }

        if !errors.errors().is_empty() {
            return Ok(CreateInviteValidation::Invalid(errors));
        }

        Ok(CreateInviteValidation::Valid(ValidatedInvite {
            group_id,
            created_by: creator_id,
            invited_user_id,
            one_time_use,
            created_at: now,
            expires_at: request.expires_at,
        }))
    }

    /// Persist a validated invite under a freshly generated code.
    ///
    /// A concurrent creator can take the same code between the existence
    /// check and the insert; the insert is retried once with a new code.
    pub async fn create_invite(&self, validated: ValidatedInvite) -> Result<Invite, InviteError> {
        let invite = match self.insert_invite(&validated).await {
            Err(InviteError::Store(StoreError::UniqueViolation { constraint }))
                if constraint == INVITE_CODE_UNIQUE_CONSTRAINT =>
            {
                tracing::warn!(
                    group_id = %validated.group_id,
                    "invite code taken concurrently, retrying with a new code"
                );
                self.insert_invite(&validated).await?
            }
            result => result?,
        };

        tracing::info!(
            invite_id = %invite.id,
            group_id = %invite.group_id,
            created_by = %invite.created_by,
            targeted = invite.invited_user_id.is_some(),
            one_time_use = invite.one_time_use,
            "invite created"
        );
        Ok(invite)
    }

    async fn insert_invite(&self, validated: &ValidatedInvite) -> Result<Invite, InviteError> {
        let code = self.generate_unique_code(self.settings.code_length).await?;
        let invite = self
            .invites
            .create_invite(NewInvite {
                group_id: validated.group_id,
                created_by: validated.created_by,
                invited_user_id: validated.invited_user_id,
                code,
                created_at: validated.created_at,
                expires_at: validated.expires_at,
                one_time_use: validated.one_time_use,
            })
            .await?;
        Ok(invite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupRole, PrivacyLevel, User};
    use crate::store::memory::InMemoryStore;
    use crate::store::{NewGroup, NewMembership, NewUser};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        manager: InviteManager,
        stores: Stores,
        backend: Arc<InMemoryStore>,
        owner: User,
        moderator: User,
        member: User,
    }

    async fn user(backend: &InMemoryStore, username: &str) -> User {
        backend
            .create_user(NewUser {
                username: username.to_string(),
                display_name: None,
                is_admin: false,
            })
            .await
            .unwrap()
    }

    async fn fixture() -> Fixture {
        let (stores, backend) = Stores::in_memory();
        let owner = user(&backend, "olga").await;
        let moderator = user(&backend, "mark").await;
        let member = user(&backend, "mia").await;
        Fixture {
            manager: InviteManager::new(&stores, InviteSettings::default()),
            stores,
            backend,
            owner,
            moderator,
            member,
        }
    }

    async fn group(f: &Fixture, privacy: PrivacyLevel) -> Uuid {
        let (group, _) = f
            .stores
            .groups
            .create_group(NewGroup {
                name: "Board Games".to_string(),
                description: None,
                owner_id: f.owner.id,
                privacy,
            })
            .await
            .unwrap();
        for (user_id, role) in [
            (f.moderator.id, GroupRole::Moderator),
            (f.member.id, GroupRole::Member),
        ] {
            f.stores
                .memberships
                .add_membership(NewMembership {
                    group_id: group.id,
                    user_id,
                    role,
                    invite_id: None,
                })
                .await
                .unwrap();
        }
        group.id
    }

    async fn seed_invite(f: &Fixture, group_id: Uuid, code: &str) {
        f.stores
            .invites
            .create_invite(NewInvite {
                group_id,
                created_by: f.owner.id,
                invited_user_id: None,
                code: code.to_string(),
                created_at: Utc::now(),
                expires_at: None,
                one_time_use: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generated_code_shape() {
        let f = fixture().await;
        let code = f.manager.generate_unique_code(12).await.unwrap();
        assert_eq!(code.len(), 12);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_forced_collision_retries() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        seed_invite(&f, group_id, "AAAAAAAA").await;

        let calls = AtomicUsize::new(0);
        let code = f
            .manager
            .generate_unique_code_with(|| {
                // First candidate differs only in case from the existing code.
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    "aaaaaaaa".to_string()
                } else {
                    "BBBBBBBB".to_string()
                }
            })
            .await
            .unwrap();

        assert_eq!(code, "BBBBBBBB");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_code_space_is_fatal() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        seed_invite(&f, group_id, "ZZZZZZZZ").await;

        let result = f
            .manager
            .generate_unique_code_with(|| "zzzzzzzz".to_string())
            .await;
        assert!(matches!(
            result,
            Err(InviteError::CodeSpaceExhausted { attempts: 10 })
        ));
    }

    #[tokio::test]
    async fn test_validate_unknown_group() {
        let f = fixture().await;
        let result = f
            .manager
            .validate_create_invite(
                f.owner.id,
                Uuid::new_v4(),
                &CreateInviteRequest::default(),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(matches!(result, CreateInviteValidation::NotFound));
    }

    #[tokio::test]
    async fn test_privacy_levels_gate_creators() {
        let f = fixture().await;
        let request = CreateInviteRequest::default();
        let cases = [
            (PrivacyLevel::Open, [true, true, true]),
            (PrivacyLevel::ModeratorInvite, [true, true, false]),
            (PrivacyLevel::OwnerInvite, [true, false, false]),
        ];

        for (privacy, allowed) in cases {
            let group_id = group(&f, privacy).await;
            for (creator, expected) in [f.owner.id, f.moderator.id, f.member.id]
                .into_iter()
                .zip(allowed)
            {
                let result = f
                    .manager
                    .validate_create_invite(creator, group_id, &request, Utc::now())
                    .await
                    .unwrap();
                if expected {
                    assert!(matches!(result, CreateInviteValidation::Valid(_)), "{privacy}");
                } else {
                    assert!(
                        matches!(result, CreateInviteValidation::Unauthorized),
                        "{privacy}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_non_member_cannot_create() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        let outsider = user(&f.backend, "otto").await;
        let result = f
            .manager
            .validate_create_invite(
                outsider.id,
                group_id,
                &CreateInviteRequest::default(),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(matches!(result, CreateInviteValidation::Unauthorized));
    }

    #[tokio::test]
    async fn test_owner_invite_rejects_moderator_then_owner_succeeds() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::OwnerInvite).await;
        let request = CreateInviteRequest::default();

        let denied = f
            .manager
            .validate_create_invite(f.moderator.id, group_id, &request, Utc::now())
            .await
            .unwrap();
        assert!(matches!(denied, CreateInviteValidation::Unauthorized));

        let CreateInviteValidation::Valid(validated) = f
            .manager
            .validate_create_invite(f.owner.id, group_id, &request, Utc::now())
            .await
            .unwrap()
        else {
            panic!("owner should be allowed to create an invite");
        };
        let invite = f.manager.create_invite(validated).await.unwrap();
        assert_eq!(invite.group_id, group_id);
        assert!(invite.one_time_use);
        assert!(!invite.used);
        assert_eq!(invite.times_used, 0);
    }

    #[tokio::test]
    async fn test_target_field_errors() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        let now = Utc::now();

        let unknown = CreateInviteRequest {
            invited_username: Some("nobody".to_string()),
            ..Default::default()
        };
        let self_target = CreateInviteRequest {
            invited_username: Some("OLGA".to_string()),
            ..Default::default()
        };
        let multi_use_target = CreateInviteRequest {
            invited_username: Some("mia".to_string()),
            one_time_use: Some(false),
            expires_at: None,
        };

        for (request, field, code) in [
            (unknown, "invited_username", "unknown_user"),
            (self_target, "invited_username", "self_target"),
            (multi_use_target, "one_time_use", "targeted_requires_one_time"),
        ] {
            let result = f
                .manager
                .validate_create_invite(f.owner.id, group_id, &request, now)
                .await
                .unwrap();
            let CreateInviteValidation::Invalid(errors) = result else {
                panic!("expected field error on {field}");
            };
            let field_errors = errors.field_errors();
            assert_eq!(field_errors[field][0].code, code);
        }
    }

    #[tokio::test]
    async fn test_expiry_must_be_in_future() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        let now = Utc::now();

        for expires_at in [now, now - Duration::minutes(5)] {
            let request = CreateInviteRequest {
                expires_at: Some(expires_at),
                ..Default::default()
            };
            let result = f
                .manager
                .validate_create_invite(f.owner.id, group_id, &request, now)
                .await
                .unwrap();
            assert!(matches!(result, CreateInviteValidation::Invalid(_)));
        }

        let request = CreateInviteRequest {
            expires_at: Some(now + Duration::days(7)),
            ..Default::default()
        };
        let result = f
            .manager
            .validate_create_invite(f.owner.id, group_id, &request, now)
            .await
            .unwrap();
        assert!(matches!(result, CreateInviteValidation::Valid(_)));
    }

    #[tokio::test]
    async fn test_field_errors_are_collected_together() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        let now = Utc::now();
        let request = CreateInviteRequest {
            invited_username: Some("ghost".to_string()),
            one_time_use: Some(false),
            expires_at: Some(now - Duration::hours(1)),
        };

        let CreateInviteValidation::Invalid(errors) = f
            .manager
            .validate_create_invite(f.owner.id, group_id, &request, now)
            .await
            .unwrap()
        else {
            panic!("expected field errors");
        };
        let fields = errors.field_errors();
        assert!(fields.contains_key("invited_username"));
        assert!(fields.contains_key("one_time_use"));
        assert!(fields.contains_key("expires_at"));
    }

    #[tokio::test]
    async fn test_targeted_invite_records_target() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::ModeratorInvite).await;
        let request = CreateInviteRequest {
            invited_username: Some("mia".to_string()),
            ..Default::default()
        };

        let CreateInviteValidation::Valid(validated) = f
            .manager
            .validate_create_invite(f.moderator.id, group_id, &request, Utc::now())
            .await
            .unwrap()
        else {
            panic!("moderator should be allowed to create an invite");
        };
        assert_eq!(validated.invited_user_id, Some(f.member.id));
        assert!(validated.one_time_use);
    }
    #[tokio::test]
    async fn test_invite_is_stored_with_validation_time() {
        let f = fixture().await;
        let group_id = group(&f, PrivacyLevel::Open).await;
        // Request latency: the insert happens well after the rules ran.
        let validated_at = Utc::now() - Duration::seconds(30);
        let request = CreateInviteRequest {
            expires_at: Some(validated_at + Duration::milliseconds(50)),
            ..Default::default()
        };

        let CreateInviteValidation::Valid(validated) = f
            .manager
            .validate_create_invite(f.owner.id, group_id, &request, validated_at)
            .await
            .unwrap()
        else {
            panic!("expiry after the validation time should be accepted");
        };
        assert_eq!(validated.created_at, validated_at);

        let invite = f.manager.create_invite(validated).await.unwrap();
        assert_eq!(invite.created_at, validated_at);
        assert_eq!(invite.expires_at, request.expires_at);
    }

    /// Invite store whose next inserts report that the code was taken by a
    /// concurrent creator.
    struct ContendedInviteStore {
        inner: Arc<InMemoryStore>,
        collisions: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl InviteStore for ContendedInviteStore {
        async fn find_invite_by_id(&self, invite_id: Uuid) -> Result<Option<Invite>, StoreError> {
            self.inner.find_invite_by_id(invite_id).await
        }

        async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError> {
            self.inner.find_invite_by_code(code).await
        }

        async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
            self.inner.code_exists(code).await
        }

        async fn create_invite(&self, invite: NewInvite) -> Result<Invite, StoreError> {
            let remaining = self.collisions.load(Ordering::SeqCst);
            if remaining > 0 {
                self.collisions.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::unique_violation(INVITE_CODE_UNIQUE_CONSTRAINT));
            }
            self.inner.create_invite(invite).await
        }

        async fn list_invites(&self, group_id: Uuid) -> Result<Vec<Invite>, StoreError> {
            self.inner.list_invites(group_id).await
        }

        async fn commit_redemption(
            &self,
            membership: crate::store::NewMembership,
            usage: crate::store::InviteUsageUpdate,
        ) -> Result<crate::models::GroupMembership, StoreError> {
            self.inner.commit_redemption(membership, usage).await
        }
    }

    async fn contended_manager(collisions: usize) -> (InviteManager, Arc<InMemoryStore>, Uuid) {
        let inner = Arc::new(InMemoryStore::new());
        let owner = user(&inner, "carla").await;
        let (group, _) = inner
            .create_group(NewGroup {
                name: "Cycling".to_string(),
                description: None,
                owner_id: owner.id,
                privacy: PrivacyLevel::Open,
            })
            .await
            .unwrap();
        let mut stores = Stores::from_backend(inner.clone());
        stores.invites = Arc::new(ContendedInviteStore {
            inner: inner.clone(),
            collisions: AtomicUsize::new(collisions),
        });
        (
            InviteManager::new(&stores, InviteSettings::default()),
            inner,
            group.id,
        )
    }

    fn validated_for(group_id: Uuid, created_by: Uuid) -> ValidatedInvite {
        ValidatedInvite {
            group_id,
            created_by,
            invited_user_id: None,
            one_time_use: true,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_concurrent_code_clash_is_retried() {
        let (manager, inner, group_id) = contended_manager(1).await;
        let creator = inner.find_user_by_username("carla").await.unwrap().unwrap();

        let invite = manager
            .create_invite(validated_for(group_id, creator.id))
            .await
            .unwrap();
        assert!(inner.code_exists(&invite.code).await.unwrap());
        assert_eq!(inner.list_invites(group_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_code_clash_is_reported() {
        let (manager, inner, group_id) = contended_manager(2).await;
        let creator = inner.find_user_by_username("carla").await.unwrap().unwrap();

        let result = manager
            .create_invite(validated_for(group_id, creator.id))
            .await;
        assert!(matches!(
            result,
            Err(InviteError::Store(StoreError::UniqueViolation { .. }))
        ));
        assert!(inner.list_invites(group_id).await.unwrap().is_empty());
    }
}
