//! Routes a validated skill command to its service operation.

use shared::command::{CommandError, SkillAction, SkillCommand};
use thiserror::Error;

use crate::service::{ServiceError, SkillService};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid command: {0}")]
    Invalid(#[from] CommandError),
    #[error("{action} skill {key} failed: {source}")]
    Service {
        action: SkillAction,
        key: String,
        #[source]
        source: ServiceError,
    },
}

pub struct SkillDispatcher<S> {
    service: S,
}

impl<S: SkillService> SkillDispatcher<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Validates `command` and runs the service operation matching its action.
    ///
    /// The key/action checks repeat what the consumer loop already did so that
    /// other callers get the same guarantees. Service failures come back
    /// wrapped with the action and key.
    pub async fn handle(&self, command: &SkillCommand) -> Result<SkillAction, DispatchError> {
        let action = command.resolve()?;

        let result = match action {
            SkillAction::Create => self.service.create_skill(command).await,
            SkillAction::Update => self.service.update_skill(command).await,
            SkillAction::UpdateName => self.service.update_name(command).await,
            SkillAction::UpdateDescription => self.service.update_description(command).await,
            SkillAction::UpdateLogo => self.service.update_logo(command).await,
            SkillAction::UpdateTags => self.service.update_tags(command).await,
            SkillAction::Delete => self.service.delete_skill(command).await,
        };

        result.map_err(|source| DispatchError::Service {
            action,
            key: command.key_or_placeholder().to_string(),
            source,
        })?;

        Ok(action)
    }
}
