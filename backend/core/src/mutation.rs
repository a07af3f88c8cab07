//! Gates in front of replacing a channel's build.
use serde_json::Value;

use crate::{
    build::{ValidBuild, validate_strict},
    catalog::CatalogState,
    error::MutationError,
    permissions::{Actor, SharingConfig, may_mutate_build},
};

/// Permission first, then validation. A denied actor never reaches the catalog.
pub fn authorize_and_validate(
    actor: &Actor,
    config: Option<&SharingConfig>,
    candidate: &Value,
    catalog: &CatalogState,
) -> Result<ValidBuild, MutationError> {
    if !may_mutate_build(actor, config) {
        return Err(MutationError::Unauthorized {
            channel_id: actor.channel_id.clone(),
        });
    }

    Ok(validate_strict(candidate, catalog)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::permissions::Role;

    fn moderator() -> Actor {
        Actor {
            role: Role::Moderator,
            user_id: Some("mod".to_string()),
            channel_id: "1234".to_string(),
        }
    }

    #[test]
    fn test_denied_before_catalog_is_consulted() {
        // an uninitialized catalog would fail with CatalogNotReady if it were reached
        let result = authorize_and_validate(
            &moderator(),
            None,
            &json!("not even a build"),
            &CatalogState::Uninitialized,
        );

        assert_eq!(
            result.unwrap_err(),
            MutationError::Unauthorized {
                channel_id: "1234".to_string()
            }
        );
    }

    #[test]
    fn test_allowed_actor_hits_not_ready_catalog() {
        let broadcaster = Actor {
            role: Role::Broadcaster,
            ..moderator()
        };

        let result = authorize_and_validate(&broadcaster, None, &json!({}), &CatalogState::Uninitialized);
        assert_eq!(result.unwrap_err(), MutationError::CatalogNotReady);
    }

    #[test]
    fn test_unauthorized_message_names_channel() {
        let error = MutationError::Unauthorized {
            channel_id: "1234".to_string(),
        };

        assert!(error.to_string().contains("set the build for 1234"));
    }
}
