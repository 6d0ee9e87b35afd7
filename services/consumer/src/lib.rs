pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use config::ConsumerConfig;
pub use consumer::{ConsumerState, ConsumerStats, SkillConsumer};
pub use dispatcher::{DispatchError, SkillDispatcher};
pub use service::{ServiceError, SkillService, StorageSkillService};
pub use storage::{PgSkillStorage, SkillStorage, StorageError};
