use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tasksync_core::{
    BatchResult, DatabaseService, NewTask, ReconciliationEngine, Task, TaskPatch, TaskService,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    engine: ReconciliationEngine,
    tasks: TaskService,
}

impl AppState {
    pub fn new(db: DatabaseService) -> Self {
        Self {
            engine: ReconciliationEngine::new(db.clone()),
            tasks: TaskService::new(db),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let sync_routes = Router::new()
        .route("/batch", post(sync_batch))
        .route("/health", get(sync_health));

    let task_routes = Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/{id}", get(get_task).put(update_task).delete(delete_task));

    Router::new()
        .route("/", get(root))
        .nest("/api/sync", sync_routes)
        .nest("/api/tasks", task_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "Task sync API is running"
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn sync_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    processed_items: Vec<BatchResult>,
}

async fn sync_batch(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        AppError::bad_request(format!("Invalid payload: {}", rejection.body_text()))
    })?;
    let items = batch_items(body)?;
    let processed_items = state.engine.process_json_batch(items).await;
    Ok(Json(BatchResponse { processed_items }))
}

/// Pull the raw `items` array out of a batch envelope, ignoring any other fields.
fn batch_items(body: Value) -> Result<Vec<Value>, AppError> {
    let Value::Object(mut envelope) = body else {
        return Err(AppError::bad_request("Invalid payload: items[] required"));
    };
    match envelope.remove("items") {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(AppError::bad_request("Invalid payload: items[] required")),
    }
}

#[derive(Debug, Serialize)]
struct DataResponse<T> {
    data: T,
}

async fn list_tasks(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Task>>>, AppError> {
    let tasks = state.tasks.list_tasks().await?;
    Ok(Json(DataResponse { data: tasks }))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Task>>, AppError> {
    let task = state
        .tasks
        .get_task(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Task not found"))?;
    Ok(Json(DataResponse { data: task }))
}

async fn create_task(
    State(state): State<AppState>,
    Json(new_task): Json<NewTask>,
) -> Result<(StatusCode, Json<DataResponse<Task>>), AppError> {
    let task = state.tasks.create_task(new_task).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<DataResponse<Task>>, AppError> {
    let task = state
        .tasks
        .update_task(&id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("Task not found"))?;
    Ok(Json(DataResponse { data: task }))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.tasks.delete_task(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Task not found"))
    }
}
