//! Skill service
//!
//! Each operation reinterprets the envelope payload as the action's typed
//! request and forwards it to storage. Nothing reaches storage unless the
//! conversion succeeded.

use async_trait::async_trait;
use shared::command::{
    ConversionError, CreateSkillRequest, SkillCommand, UpdateSkillDescriptionRequest,
    UpdateSkillLogoRequest, UpdateSkillNameRequest, UpdateSkillRequest, UpdateSkillTagsRequest,
};
use std::sync::Arc;
use thiserror::Error;

use crate::storage::{SkillStorage, StorageError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("key is required")]
    MissingKey,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SkillService: Send + Sync {
    async fn create_skill(&self, command: &SkillCommand) -> Result<(), ServiceError>;
    async fn update_skill(&self, command: &SkillCommand) -> Result<(), ServiceError>;
    async fn update_name(&self, command: &SkillCommand) -> Result<(), ServiceError>;
    async fn update_description(&self, command: &SkillCommand) -> Result<(), ServiceError>;
    async fn update_logo(&self, command: &SkillCommand) -> Result<(), ServiceError>;
    async fn update_tags(&self, command: &SkillCommand) -> Result<(), ServiceError>;
    async fn delete_skill(&self, command: &SkillCommand) -> Result<(), ServiceError>;
}

pub struct StorageSkillService<S> {
    storage: Arc<S>,
}

impl<S: SkillStorage> StorageSkillService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

fn require_key(command: &SkillCommand) -> Result<&str, ServiceError> {
    command.key().ok_or(ServiceError::MissingKey)
}

#[async_trait]
impl<S: SkillStorage> SkillService for StorageSkillService<S> {
    async fn create_skill(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let request: CreateSkillRequest = command.payload_as()?;
        self.storage.create_skill(request).await?;
        Ok(())
    }

    async fn update_skill(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let key = require_key(command)?;
        let request: UpdateSkillRequest = command.payload_as()?;
        self.storage.update_skill(key, request).await?;
        Ok(())
    }

    async fn update_name(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let key = require_key(command)?;
        let request: UpdateSkillNameRequest = command.payload_as()?;
        self.storage.update_name(key, &request.name).await?;
        Ok(())
    }

    async fn update_description(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let key = require_key(command)?;
        let request: UpdateSkillDescriptionRequest = command.payload_as()?;
        self.storage.update_description(key, &request.description).await?;
        Ok(())
    }

    async fn update_logo(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let key = require_key(command)?;
        let request: UpdateSkillLogoRequest = command.payload_as()?;
        self.storage.update_logo(key, &request.logo).await?;
        Ok(())
    }

    async fn update_tags(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let key = require_key(command)?;
        let request: UpdateSkillTagsRequest = command.payload_as()?;
        self.storage.update_tags(key, &request.tags).await?;
        Ok(())
    }

    async fn delete_skill(&self, command: &SkillCommand) -> Result<(), ServiceError> {
        let key = require_key(command)?;
        self.storage.delete_skill(key).await?;
        Ok(())
    }
}
