pub mod broker;
pub mod command;
pub mod config;
pub mod database;
pub mod logger;
pub mod nats;
pub mod shutdown;


pub use broker::{BrokerError, Delivery, MessageSink, PartitionSource};
pub use command::{SkillAction, SkillCommand, SkillRequest};
pub use nats::{NatsClient, NatsPartition};
