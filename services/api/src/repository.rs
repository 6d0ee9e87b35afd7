//! Skill read repository

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Skill {
    pub key: String,
    pub name: String,
    pub description: String,
    pub logo: String,
    pub tags: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn get_skill(&self, key: &str) -> Result<Option<Skill>, RepositoryError>;
    async fn get_skills(&self) -> Result<Vec<Skill>, RepositoryError>;
}

pub struct PgSkillRepository {
    pool: PgPool,
}

impl PgSkillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SkillRepository for PgSkillRepository {
    async fn get_skill(&self, key: &str) -> Result<Option<Skill>, RepositoryError> {
        let skill = sqlx::query_as::<_, Skill>(
            "SELECT key, name, description, logo, tags FROM skill WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(skill)
    }

    async fn get_skills(&self) -> Result<Vec<Skill>, RepositoryError> {
        let skills = sqlx::query_as::<_, Skill>("SELECT key, name, description, logo, tags FROM skill ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(skills)
    }
}
