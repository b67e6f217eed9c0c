//! Startup provisioning.
//!
//! Creates the configured administrator and their default group on first
//! start. Safe to run on every boot: existing records are left untouched.

use domain::models::{Group, PrivacyLevel, User};
use domain::store::{NewGroup, NewUser, StoreError, Stores};
use tracing::{info, warn};

use crate::config::BootstrapConfig;

/// Error types for bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// What bootstrap found or created.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub admin: Option<User>,
    pub admin_created: bool,
    pub group: Option<Group>,
    pub group_created: bool,
}

/// Provision the administrator and default group if configured.
///
/// Call after migrations. Does nothing when `admin_username` is unset.
pub async fn bootstrap(
    stores: &Stores,
    config: &BootstrapConfig,
) -> Result<BootstrapReport, BootstrapError> {
    let mut report = BootstrapReport::default();

    let Some(username) = config
        .admin_username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    else {
        if config.default_group_name.is_some() {
            warn!("bootstrap.default_group_name is set without bootstrap.admin_username - skipping bootstrap");
        }
        return Ok(report);
    };

    shared::validation::validate_username(username)
        .map_err(|e| BootstrapError::Config(format!("bootstrap.admin_username: {}", e)))?;

    let admin = match stores.users.find_user_by_username(username).await? {
        Some(user) => {
            if !user.is_admin {
                warn!(
                    user_id = %user.id,
                    username = %user.username,
                    "Bootstrap user exists without the administrator capability"
                );
            }
            user
        }
        None => {
            let created = stores
                .users
                .create_user(NewUser {
                    username: username.to_string(),
                    display_name: config.admin_display_name.clone(),
                    is_admin: true,
                })
                .await?;
            info!(user_id = %created.id, username = %created.username, "Bootstrap admin user created");
            report.admin_created = true;
            created
        }
    };

    if let Some(group_name) = config
        .default_group_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        let existing = stores
            .groups
            .find_groups_by_owner(admin.id)
            .await?
            .into_iter()
            .find(|g| g.name == group_name);

        let group = match existing {
            Some(group) => group,
            None => {
                let (group, _) = stores
                    .groups
                    .create_group(NewGroup {
                        name: group_name.to_string(),
                        description: None,
                        owner_id: admin.id,
                        privacy: PrivacyLevel::default(),
                    })
                    .await?;
                info!(group_id = %group.id, owner_id = %admin.id, "Bootstrap default group created");
                report.group_created = true;
                group
            }
        };
        report.group = Some(group);
    }

    report.admin = Some(admin);
    Ok(report)
}
