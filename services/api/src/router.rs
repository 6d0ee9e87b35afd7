use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::queue::SkillQueue;
use crate::repository::SkillRepository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn SkillRepository>,
    pub queue: Arc<dyn SkillQueue>,
}

impl AppState {
    pub fn new(repository: Arc<dyn SkillRepository>, queue: Arc<dyn SkillQueue>) -> Self {
        Self { repository, queue }
    }
}

pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/skills", get(handlers::get_skills).post(handlers::create_skill))
        .route(
            "/skills/:key",
            get(handlers::get_skill)
                .put(handlers::update_skill)
                .delete(handlers::delete_skill),
        )
        .route("/skills/:key/actions/name", patch(handlers::update_name))
        .route("/skills/:key/actions/description", patch(handlers::update_description))
        .route("/skills/:key/actions/logo", patch(handlers::update_logo))
        .route("/skills/:key/actions/tags", patch(handlers::update_tags));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
