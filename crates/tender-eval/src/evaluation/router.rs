use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::criteria::CriteriaDocument;
use super::scores::ReviewerScore;
use super::session::{EvaluationService, EvaluationServiceError, SessionError, SessionStore};
use crate::domain::SessionId;

/// Router builder exposing HTTP endpoints for the evaluation session lifecycle.
pub fn evaluation_router<S>(service: Arc<EvaluationService<S>>) -> Router
where
    S: SessionStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/evaluations/:session_id",
            post(open_session_handler::<S>).get(session_handler::<S>),
        )
        .route(
            "/api/v1/evaluations/:session_id/aggregate",
            post(aggregate_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn open_session_handler<S>(
    State(service): State<Arc<EvaluationService<S>>>,
    Path(session_id): Path<String>,
    axum::Json(document): axum::Json<CriteriaDocument>,
) -> Response
where
    S: SessionStore + 'static,
{
    match service.open_session(SessionId(session_id), document) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(EvaluationServiceError::Schema(error)) => {
            let payload = json!({ "error": error.to_string(), "detail": error });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(EvaluationServiceError::Session(SessionError::Conflict)) => {
            let payload = json!({ "error": "evaluation session already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn session_handler<S>(
    State(service): State<Arc<EvaluationService<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStore + 'static,
{
    let id = SessionId(session_id);
    match service.session(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(EvaluationServiceError::Session(SessionError::NotFound)) => session_not_found(&id),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn aggregate_handler<S>(
    State(service): State<Arc<EvaluationService<S>>>,
    Path(session_id): Path<String>,
    axum::Json(scores): axum::Json<Vec<ReviewerScore>>,
) -> Response
where
    S: SessionStore + 'static,
{
    let id = SessionId(session_id);
    match service.aggregate_batch(&id, &scores) {
        Ok(batch) => (StatusCode::OK, axum::Json(batch)).into_response(),
        Err(EvaluationServiceError::Session(SessionError::NotFound)) => session_not_found(&id),
        Err(other) => internal_error(other),
    }
}

fn session_not_found(id: &SessionId) -> Response {
    let payload = json!({
        "session_id": id.0,
        "error": "evaluation session not found",
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(error: EvaluationServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
