//! Skill storage
//!
//! Applies typed mutations to the `skill` table. Updates and deletes that
//! match no row are not errors.

use async_trait::async_trait;
use shared::command::{CreateSkillRequest, UpdateSkillRequest};
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SkillStorage: Send + Sync {
    async fn create_skill(&self, request: CreateSkillRequest) -> Result<(), StorageError>;
    async fn update_skill(&self, key: &str, request: UpdateSkillRequest) -> Result<(), StorageError>;
    async fn update_name(&self, key: &str, name: &str) -> Result<(), StorageError>;
    async fn update_description(&self, key: &str, description: &str) -> Result<(), StorageError>;
    async fn update_logo(&self, key: &str, logo: &str) -> Result<(), StorageError>;
    async fn update_tags(&self, key: &str, tags: &[String]) -> Result<(), StorageError>;
    async fn delete_skill(&self, key: &str) -> Result<(), StorageError>;
}

pub struct PgSkillStorage {
    pool: PgPool,
}

impl PgSkillStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(include_str!("../../../migrations/0001_create_skill.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn log_unmatched(result: &PgQueryResult, operation: &str, key: &str) {
    if result.rows_affected() == 0 {
        tracing::warn!(operation = %operation, key = %key, "No skill matched key");
    }
}

#[async_trait]
impl SkillStorage for PgSkillStorage {
    async fn create_skill(&self, request: CreateSkillRequest) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO skill (key, name, description, logo, tags) VALUES ($1, $2, $3, $4, $5)")
            .bind(&request.key)
            .bind(&request.name)
            .bind(&request.description)
            .bind(&request.logo)
            .bind(&request.tags)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_skill(&self, key: &str, request: UpdateSkillRequest) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE skill SET name = $1, description = $2, logo = $3, tags = $4 WHERE key = $5",
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.logo)
        .bind(&request.tags)
        .bind(key)
        .execute(&self.pool)
        .await?;

        log_unmatched(&result, "update", key);
        Ok(())
    }

    async fn update_name(&self, key: &str, name: &str) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE skill SET name = $1 WHERE key = $2")
            .bind(name)
            .bind(key)
            .execute(&self.pool)
            .await?;

        log_unmatched(&result, "update_name", key);
        Ok(())
    }

    async fn update_description(&self, key: &str, description: &str) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE skill SET description = $1 WHERE key = $2")
            .bind(description)
            .bind(key)
            .execute(&self.pool)
            .await?;

        log_unmatched(&result, "update_description", key);
        Ok(())
    }

    async fn update_logo(&self, key: &str, logo: &str) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE skill SET logo = $1 WHERE key = $2")
            .bind(logo)
            .bind(key)
            .execute(&self.pool)
            .await?;

        log_unmatched(&result, "update_logo", key);
        Ok(())
    }

    async fn update_tags(&self, key: &str, tags: &[String]) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE skill SET tags = $1 WHERE key = $2")
            .bind(tags)
            .bind(key)
            .execute(&self.pool)
            .await?;

        log_unmatched(&result, "update_tags", key);
        Ok(())
    }

    async fn delete_skill(&self, key: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM skill WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        log_unmatched(&result, "delete", key);
        Ok(())
    }
}
