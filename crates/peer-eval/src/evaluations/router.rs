use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CycleId, TaskId};
use super::org::OrgSnapshotProvider;
use super::repository::EvaluationStore;
use super::scoring::ScoreSubmission;
use super::service::{ErrorKind, EvaluationService, EvaluationServiceError};

/// Body of `POST /api/v1/tasks/:task_id/scores`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitScoresRequest {
    pub scores: Vec<ScoreSubmission>,
}

/// Router builder exposing generation, scoring and result endpoints.
pub fn evaluation_router<S, P>(service: Arc<EvaluationService<S, P>>) -> Router
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/cycles/:cycle_id/tasks/generate",
            post(generate_handler::<S, P>),
        )
        .route("/api/v1/cycles/:cycle_id/tasks", get(tasks_handler::<S, P>))
        .route("/api/v1/cycles/:cycle_id/stats", get(stats_handler::<S, P>))
        .route(
            "/api/v1/cycles/:cycle_id/results/calculate",
            post(calculate_handler::<S, P>),
        )
        .route(
            "/api/v1/cycles/:cycle_id/results",
            get(results_handler::<S, P>),
        )
        .route(
            "/api/v1/tasks/:task_id/scores",
            post(submit_scores_handler::<S, P>),
        )
        .route(
            "/api/v1/evaluation-codes/:code/tasks",
            get(code_tasks_handler::<S, P>),
        )
        .with_state(service)
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: EvaluationServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(error.kind()), axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(result: Result<T, EvaluationServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn generate_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(cycle_id): Path<u64>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.generate_tasks(CycleId(cycle_id)).await)
}

pub(crate) async fn tasks_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(cycle_id): Path<u64>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.cycle_tasks(CycleId(cycle_id)))
}

pub(crate) async fn stats_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(cycle_id): Path<u64>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.cycle_stats(CycleId(cycle_id)))
}

pub(crate) async fn calculate_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(cycle_id): Path<u64>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.calculate_cycle_results(CycleId(cycle_id)))
}

pub(crate) async fn results_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(cycle_id): Path<u64>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.cycle_results(CycleId(cycle_id)))
}

pub(crate) async fn submit_scores_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(task_id): Path<u64>,
    axum::Json(request): axum::Json<SubmitScoresRequest>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.submit_task_scores(TaskId(task_id), request.scores))
}

pub(crate) async fn code_tasks_handler<S, P>(
    State(service): State<Arc<EvaluationService<S, P>>>,
    Path(code): Path<String>,
) -> Response
where
    S: EvaluationStore + 'static,
    P: OrgSnapshotProvider + 'static,
{
    respond(service.tasks_for_code(code.trim()))
}
