//! Response envelope shared by every endpoint

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn success<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        status: "success",
        data: Some(data),
        message: None,
    }
}

pub fn message(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        status: "success",
        data: None,
        message: Some(message.into()),
    }
}

pub fn error(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        status: "error",
        data: None,
        message: Some(message.into()),
    }
}

/// A failed request: status code plus an error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid request")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "skill not found")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(error(self.message))).into_response()
    }
}
