//! Support for end-to-end pipeline tests.

use async_trait::async_trait;
use consumer::storage::{SkillStorage, StorageError};
use shared::command::{CreateSkillRequest, UpdateSkillRequest};
use std::sync::{Arc, Mutex};

/// A storage call as observed by [`RecordingStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Create(CreateSkillRequest),
    Update(String, UpdateSkillRequest),
    UpdateName(String, String),
    UpdateDescription(String, String),
    UpdateLogo(String, String),
    UpdateTags(String, Vec<String>),
    Delete(String),
}

/// Records every call; keys listed in `failing` get an error instead.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    calls: Arc<Mutex<Vec<StorageCall>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, key: &str) {
        self.lock_failing().push(key.to_string());
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.failing.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, key: &str, call: StorageCall) -> Result<(), StorageError> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(call);
        if self.lock_failing().iter().any(|k| k == key) {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SkillStorage for RecordingStorage {
    async fn create_skill(&self, request: CreateSkillRequest) -> Result<(), StorageError> {
        let key = request.key.clone();
        self.record(&key, StorageCall::Create(request))
    }

    async fn update_skill(&self, key: &str, request: UpdateSkillRequest) -> Result<(), StorageError> {
        self.record(key, StorageCall::Update(key.to_string(), request))
    }

    async fn update_name(&self, key: &str, name: &str) -> Result<(), StorageError> {
        self.record(key, StorageCall::UpdateName(key.to_string(), name.to_string()))
    }

    async fn update_description(&self, key: &str, description: &str) -> Result<(), StorageError> {
        self.record(key, StorageCall::UpdateDescription(key.to_string(), description.to_string()))
    }

    async fn update_logo(&self, key: &str, logo: &str) -> Result<(), StorageError> {
        self.record(key, StorageCall::UpdateLogo(key.to_string(), logo.to_string()))
    }

    async fn update_tags(&self, key: &str, tags: &[String]) -> Result<(), StorageError> {
        self.record(key, StorageCall::UpdateTags(key.to_string(), tags.to_vec()))
    }

    async fn delete_skill(&self, key: &str) -> Result<(), StorageError> {
        self.record(key, StorageCall::Delete(key.to_string()))
    }
}
