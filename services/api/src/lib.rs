pub mod config;
pub mod handlers;
pub mod queue;
pub mod repository;
pub mod response;
pub mod router;


pub use config::ApiConfig;
pub use queue::{CommandPublisher, PublishError, SkillQueue};
pub use repository::{PgSkillRepository, RepositoryError, Skill, SkillRepository};
pub use router::{create_router, AppState};
