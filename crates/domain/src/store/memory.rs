//! In-memory storage backend.
//!
//! Used by tests and local development. All state sits behind one mutex so
//! every trait method is a single atomic step, which gives the same
//! uniqueness and commit guarantees the PostgreSQL schema enforces.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    GroupChanges, GroupStore, InviteStore, InviteUsageUpdate, MembershipStore, NewGroup,
    NewInvite, NewMembership, NewUser, StoreError, UserStore, INVITE_CODE_UNIQUE_CONSTRAINT,
    INVITE_EXPIRY_CONSTRAINT, MEMBERSHIP_UNIQUE_CONSTRAINT,
};
use crate::models::{Group, GroupMembership, GroupRole, Invite, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    memberships: HashMap<(Uuid, Uuid), GroupMembership>,
    invites: HashMap<Uuid, Invite>,
}

impl State {
    fn code_taken(&self, code: &str) -> bool {
        self.invites
            .values()
            .any(|invite| invite.code.eq_ignore_ascii_case(code))
    }

    fn insert_membership(&mut self, new: NewMembership) -> Result<GroupMembership, StoreError> {
        let key = (new.group_id, new.user_id);
        if self.memberships.contains_key(&key) {
            return Err(StoreError::unique_violation(MEMBERSHIP_UNIQUE_CONSTRAINT));
        }

        let now = Utc::now();
        let membership = GroupMembership {
            id: Uuid::new_v4(),
            group_id: new.group_id,
            user_id: new.user_id,
            role: new.role,
            invite_id: new.invite_id,
            joined_at: now,
            updated_at: now,
        };
        self.memberships.insert(key, membership.clone());
        Ok(membership)
    }
}

/// Mutex-guarded store implementing every storage trait.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state()?.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.trim();
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state()?;
        if state
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::unique_violation("idx_users_username_lower"));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            display_name: user.display_name,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn create_group(&self, new: NewGroup) -> Result<(Group, GroupMembership), StoreError> {
        let mut state = self.state()?;
        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            owner_id: new.owner_id,
            privacy: new.privacy,
            created_at: now,
            updated_at: now,
        };
        state.groups.insert(group.id, group.clone());

        let owner = state.insert_membership(NewMembership {
            group_id: group.id,
            user_id: group.owner_id,
            role: GroupRole::Owner,
            invite_id: None,
        })?;

        Ok((group, owner))
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.state()?.groups.get(&group_id).cloned())
    }

    async fn find_groups_by_owner(&self, owner_id: Uuid) -> Result<Vec<Group>, StoreError> {
        let mut groups: Vec<Group> = self
            .state()?
            .groups
            .values()
            .filter(|g| g.owner_id == owner_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }

    async fn update_group(
        &self,
        group_id: Uuid,
        changes: GroupChanges,
    ) -> Result<Option<Group>, StoreError> {
        let mut state = self.state()?;
        let Some(group) = state.groups.get_mut(&group_id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            group.name = name;
        }
        if let Some(description) = changes.description {
            group.description = Some(description);
        }
        if let Some(privacy) = changes.privacy {
            group.privacy = privacy;
        }
        group.updated_at = Utc::now();

        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        if state.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        state.memberships.retain(|(gid, _), _| *gid != group_id);
        state.invites.retain(|_, invite| invite.group_id != group_id);
        Ok(true)
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMembership>, StoreError> {
        Ok(self
            .state()?
            .memberships
            .get(&(group_id, user_id))
            .cloned())
    }

    async fn list_memberships(&self, group_id: Uuid) -> Result<Vec<GroupMembership>, StoreError> {
        let mut members: Vec<GroupMembership> = self
            .state()?
            .memberships
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        // Owner first, then by join time.
        members.sort_by(|a, b| b.role.cmp(&a.role).then(a.joined_at.cmp(&b.joined_at)));
        Ok(members)
    }

    async fn count_members(&self, group_id: Uuid) -> Result<i64, StoreError> {
        let count = self
            .state()?
            .memberships
            .keys()
            .filter(|(gid, _)| *gid == group_id)
            .count();
        Ok(count as i64)
    }

    async fn add_membership(
        &self,
        membership: NewMembership,
    ) -> Result<GroupMembership, StoreError> {
        let mut state = self.state()?;
        if !state.groups.contains_key(&membership.group_id) {
            return Err(StoreError::NotFound);
        }
        state.insert_membership(membership)
    }

    async fn update_membership_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> Result<Option<GroupMembership>, StoreError> {
        let mut state = self.state()?;
        let Some(membership) = state.memberships.get_mut(&(group_id, user_id)) else {
            return Ok(None);
        };
        membership.role = role;
        membership.updated_at = Utc::now();
        Ok(Some(membership.clone()))
    }

    async fn remove_membership(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .state()?
            .memberships
            .remove(&(group_id, user_id))
            .is_some())
    }
}

#[async_trait]
impl InviteStore for InMemoryStore {
    async fn find_invite_by_id(&self, invite_id: Uuid) -> Result<Option<Invite>, StoreError> {
        Ok(self.state()?.invites.get(&invite_id).cloned())
    }

    async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError> {
        let code = code.trim();
        Ok(self
            .state()?
            .invites
            .values()
            .find(|invite| invite.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.state()?.code_taken(code.trim()))
    }

    async fn create_invite(&self, new: NewInvite) -> Result<Invite, StoreError> {
        let mut state = self.state()?;
        if !state.groups.contains_key(&new.group_id) {
            return Err(StoreError::NotFound);
        }
        if state.code_taken(&new.code) {
            return Err(StoreError::unique_violation(INVITE_CODE_UNIQUE_CONSTRAINT));
        }
        if new.expires_at.is_some_and(|expires_at| expires_at <= new.created_at) {
            return Err(StoreError::CheckViolation {
                constraint: INVITE_EXPIRY_CONSTRAINT.to_string(),
            });
        }

        let invite = Invite {
            id: Uuid::new_v4(),
            group_id: new.group_id,
            created_by: new.created_by,
            invited_user_id: new.invited_user_id,
            code: new.code.to_ascii_uppercase(),
            created_at: new.created_at,
            expires_at: new.expires_at,
            one_time_use: new.one_time_use,
            used: false,
            times_used: 0,
        };
        state.invites.insert(invite.id, invite.clone());
        Ok(invite)
    }

    async fn list_invites(&self, group_id: Uuid) -> Result<Vec<Invite>, StoreError> {
        let mut invites: Vec<Invite> = self
            .state()?
            .invites
            .values()
            .filter(|invite| invite.group_id == group_id)
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }

    async fn commit_redemption(
        &self,
        membership: NewMembership,
        usage: InviteUsageUpdate,
    ) -> Result<GroupMembership, StoreError> {
        let mut state = self.state()?;

        if state
            .memberships
            .contains_key(&(membership.group_id, membership.user_id))
        {
            return Err(StoreError::unique_violation(MEMBERSHIP_UNIQUE_CONSTRAINT));
        }

        match state.invites.get(&usage.invite_id) {
            None => return Err(StoreError::NotFound),
            Some(invite) if invite.one_time_use && invite.used => {
                return Err(StoreError::InviteConsumed)
            }
            Some(_) => {}
        }

        let created = state.insert_membership(membership)?;
        if let Some(invite) = state.invites.get_mut(&usage.invite_id) {
            invite.times_used += 1;
            if usage.one_time_use {
                invite.used = true;
            }
        }
        Ok(created)
    }
}
