//! # Permissions
//!
//! Who may replace the published build.
//!
//! The broadcaster (and anything above) always may. Moderators depend on the broadcaster's
//! sharing config: nobody, every moderator, or only the moderators ticked in the mod list.
//! No config published yet means moderators may not.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Viewer,
    Moderator,
    Broadcaster,
    ExtensionAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub role: Role,
    /// `None` until the viewer shares their identity with the extension.
    pub user_id: Option<String>,
    pub channel_id: String,
}

impl Actor {
    pub fn require(&self, role: Role) -> Result<(), PermissionError> {
        if self.role < role {
            return Err(PermissionError::InsufficientRole);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ModsCanSet {
    No,
    All,
    Some,
}

impl TryFrom<u8> for ModsCanSet {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ModsCanSet::No),
            1 => Ok(ModsCanSet::All),
            2 => Ok(ModsCanSet::Some),
            other => Err(format!("{other} is not a valid modsCanSet value")),
        }
    }
}

impl From<ModsCanSet> for u8 {
    fn from(value: ModsCanSet) -> Self {
        match value {
            ModsCanSet::No => 0,
            ModsCanSet::All => 1,
            ModsCanSet::Some => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    pub name: String,
    pub allowed: bool,
}

pub type ModList = BTreeMap<String, ModEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingConfig {
    pub mods_can_set: ModsCanSet,
    #[serde(default)]
    pub mod_list: ModList,
    #[serde(default)]
    pub display_name: String,
}

/// Moderator as listed by Twitch Helix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitchModerator {
    pub user_id: String,
    pub user_name: String,
}

pub fn may_mutate_build(actor: &Actor, config: Option<&SharingConfig>) -> bool {
    if actor.role >= Role::Broadcaster {
        return true;
    }

    let Some(config) = config else {
        return false;
    };

    match config.mods_can_set {
        ModsCanSet::No => false,
        ModsCanSet::All => actor.role >= Role::Moderator,
        ModsCanSet::Some => {
            actor.role >= Role::Moderator
                && actor
                    .user_id
                    .as_ref()
                    .and_then(|id| config.mod_list.get(id))
                    .is_some_and(|entry| entry.allowed)
        }
    }
}

/// Current moderators with their configured permission, new moderators default to not allowed.
/// Entries for users who are no longer moderators are dropped.
pub fn reconcile_mods(configured: Option<&ModList>, moderators: &[TwitchModerator]) -> ModList {
    moderators
        .iter()
        .map(|moderator| {
            let entry = configured
                .and_then(|mods| mods.get(&moderator.user_id))
                .cloned()
                .unwrap_or_else(|| ModEntry {
                    name: moderator.user_name.clone(),
                    allowed: false,
                });

            (moderator.user_id.clone(), entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn actor(role: Role, user_id: Option<&str>) -> Actor {
        Actor {
            role,
            user_id: user_id.map(str::to_string),
            channel_id: "channel".to_string(),
        }
    }

    fn config(mods_can_set: ModsCanSet) -> SharingConfig {
        let mut mod_list = ModList::new();
        mod_list.insert(
            "fakeid".to_string(),
            ModEntry {
                name: "fakeuser".to_string(),
                allowed: true,
            },
        );
        mod_list.insert(
            "fakeid2".to_string(),
            ModEntry {
                name: "fakeuser2".to_string(),
                allowed: false,
            },
        );

        SharingConfig {
            mods_can_set,
            mod_list,
            display_name: String::new(),
        }
    }

    const ALL_CONFIGS: [ModsCanSet; 3] = [ModsCanSet::No, ModsCanSet::All, ModsCanSet::Some];

    #[test]
    fn test_broadcaster_always_allowed() {
        for role in [Role::Broadcaster, Role::ExtensionAdmin] {
            let actor = actor(role, None);

            assert!(may_mutate_build(&actor, None));
            for mods_can_set in ALL_CONFIGS {
                assert!(may_mutate_build(&actor, Some(&config(mods_can_set))));
            }
        }
    }

    #[test]
    fn test_viewer_never_allowed() {
        // listed and allowed, but still only a viewer
        let viewer = actor(Role::Viewer, Some("fakeid"));

        assert!(!may_mutate_build(&viewer, None));
        for mods_can_set in ALL_CONFIGS {
            assert!(!may_mutate_build(&viewer, Some(&config(mods_can_set))));
        }
    }

    #[test]
    fn test_moderator_follows_config() {
        let moderator = actor(Role::Moderator, Some("fakeid"));

        assert!(!may_mutate_build(&moderator, None));
        assert!(!may_mutate_build(&moderator, Some(&config(ModsCanSet::No))));
        assert!(may_mutate_build(&moderator, Some(&config(ModsCanSet::All))));
        assert!(may_mutate_build(&moderator, Some(&config(ModsCanSet::Some))));
    }

    #[test]
    fn test_some_requires_allowed_entry() {
        let some = config(ModsCanSet::Some);

        let denied = actor(Role::Moderator, Some("fakeid2"));
        assert!(!may_mutate_build(&denied, Some(&some)));

        let unlisted = actor(Role::Moderator, Some("someone else"));
        assert!(!may_mutate_build(&unlisted, Some(&some)));

        let anonymous = actor(Role::Moderator, None);
        assert!(!may_mutate_build(&anonymous, Some(&some)));
        assert!(may_mutate_build(&anonymous, Some(&config(ModsCanSet::All))));
    }

    #[test]
    fn test_require_role() {
        let moderator = actor(Role::Moderator, None);

        assert!(moderator.require(Role::Viewer).is_ok());
        assert!(moderator.require(Role::Moderator).is_ok());
        assert_eq!(
            moderator.require(Role::Broadcaster),
            Err(PermissionError::InsufficientRole)
        );
    }

    #[test]
    fn test_config_from_twitch_content() {
        let config: SharingConfig = serde_json::from_value(json!({
            "modsCanSet": 2,
            "modList": { "123": { "name": "mod", "allowed": true } },
            "displayName": "streamer",
            "buildRequests": { "enabledFor": 0 }
        }))
        .unwrap();

        assert_eq!(config.mods_can_set, ModsCanSet::Some);
        assert!(config.mod_list["123"].allowed);

        let invalid = serde_json::from_value::<SharingConfig>(json!({ "modsCanSet": 3 }));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_role_from_claims() {
        let role: Role = serde_json::from_value(json!("extensionAdmin")).unwrap();
        assert_eq!(role, Role::ExtensionAdmin);
        assert!(Role::Viewer < Role::Moderator);
        assert!(Role::Broadcaster < Role::ExtensionAdmin);
    }

    #[test]
    fn test_reconcile_mods() {
        let configured = config(ModsCanSet::Some).mod_list;
        let current = vec![
            TwitchModerator {
                user_id: "fakeid".to_string(),
                user_name: "renamed".to_string(),
            },
            TwitchModerator {
                user_id: "newid".to_string(),
                user_name: "newmod".to_string(),
            },
        ];

        let mods = reconcile_mods(Some(&configured), &current);

        assert_eq!(mods.len(), 2);
        assert_eq!(mods["fakeid"].name, "fakeuser");
        assert!(mods["fakeid"].allowed);
        assert_eq!(
            mods["newid"],
            ModEntry {
                name: "newmod".to_string(),
                allowed: false
            }
        );
        assert!(!mods.contains_key("fakeid2"));

        assert!(reconcile_mods(None, &current).values().all(|entry| !entry.allowed));
    }
}
