//! Skill HTTP handlers
//!
//! Reads go straight to the repository. Writes check existence, publish a
//! command and answer as soon as the broker accepted it.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use shared::command::{
    CreateSkillRequest, SkillRequest, UpdateSkillDescriptionRequest, UpdateSkillLogoRequest,
    UpdateSkillNameRequest, UpdateSkillRequest, UpdateSkillTagsRequest,
};

use crate::repository::Skill;
use crate::response::{self, ApiError, ApiResponse};
use crate::router::AppState;

type Accepted = (StatusCode, Json<ApiResponse<()>>);

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected request body");
            Err(ApiError::bad_request())
        }
    }
}

async fn find_skill(state: &AppState, key: &str) -> Result<Option<Skill>, ApiError> {
    state.repository.get_skill(key).await.map_err(|e| {
        tracing::error!(key = %key, error = %e, "Failed to load skill");
        ApiError::internal("not be able to get skill")
    })
}

async fn require_skill(state: &AppState, key: &str) -> Result<Skill, ApiError> {
    find_skill(state, key).await?.ok_or_else(ApiError::not_found)
}

async fn publish(
    state: &AppState,
    key: String,
    request: SkillRequest,
    subject: &str,
) -> Result<(), ApiError> {
    let action = request.action();
    state.queue.publish(Some(key.clone()), request).await.map_err(|e| {
        tracing::error!(action = %action, key = %key, error = %e, "Failed to publish skill command");
        ApiError::internal(format!("not be able to {subject}"))
    })
}

fn accepted(status: StatusCode, message: &str) -> Accepted {
    (status, Json(response::message(message)))
}

pub async fn get_skills(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Skill>>>, ApiError> {
    let skills = state.repository.get_skills().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list skills");
        ApiError::internal("not be able to get skills")
    })?;

    Ok(Json(response::success(skills)))
}

pub async fn get_skill(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<Skill>>, ApiError> {
    let skill = require_skill(&state, &key).await?;
    Ok(Json(response::success(skill)))
}

pub async fn create_skill(
    State(state): State<AppState>,
    body: Result<Json<CreateSkillRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let request = parse_body(body)?;
    if blank(&request.key) || blank(&request.name) || blank(&request.description) || blank(&request.logo) {
        return Err(ApiError::bad_request());
    }

    if find_skill(&state, &request.key).await?.is_some() {
        return Err(ApiError::new(StatusCode::CONFLICT, "skill already exists"));
    }

    let key = request.key.clone();
    publish(&state, key, SkillRequest::Create(request), "create skill").await?;

    Ok(accepted(StatusCode::CREATED, "creating skill already in progress"))
}

pub async fn update_skill(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<UpdateSkillRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let request = parse_body(body)?;
    if blank(&request.name) || blank(&request.description) || blank(&request.logo) {
        return Err(ApiError::bad_request());
    }

    require_skill(&state, &key).await?;
    publish(&state, key, SkillRequest::Update(request), "update skill").await?;

    Ok(accepted(StatusCode::OK, "updating skill already in progress"))
}

pub async fn update_name(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<UpdateSkillNameRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let request = parse_body(body)?;
    if blank(&request.name) {
        return Err(ApiError::bad_request());
    }

    require_skill(&state, &key).await?;
    publish(&state, key, SkillRequest::UpdateName(request), "update skill name").await?;

    Ok(accepted(StatusCode::OK, "updating skill name already in progress"))
}

pub async fn update_description(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<UpdateSkillDescriptionRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let request = parse_body(body)?;
    if blank(&request.description) {
        return Err(ApiError::bad_request());
    }

    require_skill(&state, &key).await?;
    publish(
        &state,
        key,
        SkillRequest::UpdateDescription(request),
        "update skill description",
    )
    .await?;

    Ok(accepted(StatusCode::OK, "updating skill description already in progress"))
}

pub async fn update_logo(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<UpdateSkillLogoRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let request = parse_body(body)?;
    if blank(&request.logo) {
        return Err(ApiError::bad_request());
    }

    require_skill(&state, &key).await?;
    publish(&state, key, SkillRequest::UpdateLogo(request), "update skill logo").await?;

    Ok(accepted(StatusCode::OK, "updating skill logo already in progress"))
}

pub async fn update_tags(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<UpdateSkillTagsRequest>, JsonRejection>,
) -> Result<Accepted, ApiError> {
    let request = parse_body(body)?;

    require_skill(&state, &key).await?;
    publish(&state, key, SkillRequest::UpdateTags(request), "update skill tags").await?;

    Ok(accepted(StatusCode::OK, "updating skill tags already in progress"))
}

pub async fn delete_skill(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Accepted, ApiError> {
    require_skill(&state, &key).await?;
    publish(&state, key, SkillRequest::Delete, "delete skill").await?;

    Ok(accepted(StatusCode::OK, "deleting skill already in progress"))
}

pub async fn health_check() -> &'static str {
    "OK"
}
