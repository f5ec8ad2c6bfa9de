//! Task handlers.

use super::{CreateTaskRequest, CreateTaskResponse};
use crate::api::AppState;
use crate::error::ApiError;
use crate::types::TaskId;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /tasks - Submit a batch of URLs
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 202, description = "Task accepted and queued", body = CreateTaskResponse),
        (status = 400, description = "Malformed body or no usable URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation(rejection.body_text())),
            )
                .into_response();
        }
    };

    match state.manager.create_task(&request.urls).await {
        Ok(task) => (
            StatusCode::ACCEPTED,
            Json(CreateTaskResponse {
                task_id: task.id,
                status: task.status,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected task submission");
            e.into_response()
        }
    }
}

/// GET /tasks/:id - Get task status
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task status", body = crate::types::TaskInfo),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.manager.task_info(&TaskId::from(id)).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}
