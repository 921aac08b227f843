use crate::infra::{default_field_specs, AppState, CompareState, InMemorySessionStore};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tender_eval::comparison::{
    AttributeRecord, ComparisonEngine, ComparisonReport, FieldSpec, PolicyDocument, WeightedPolicy,
};
use tender_eval::error::AppError;
use tender_eval::evaluation::{evaluation_router, EvaluationService};

#[derive(Debug, Deserialize)]
pub(crate) struct CompareRequest {
    pub(crate) records: Vec<AttributeRecord>,
    /// Defaults to the bundled qualification field specs when omitted.
    #[serde(default)]
    pub(crate) field_specs: Option<Vec<FieldSpec>>,
    /// Overrides the configured comparability policy for this request; the
    /// document is validated before any record is compared.
    #[serde(default)]
    pub(crate) policy: Option<PolicyDocument>,
}

pub(crate) fn with_evaluation_routes(
    service: Arc<EvaluationService<InMemorySessionStore>>,
) -> axum::Router {
    evaluation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/qualifications/compare",
            axum::routing::post(compare_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn compare_endpoint(
    Extension(state): Extension<CompareState>,
    Json(payload): Json<CompareRequest>,
) -> Result<Json<ComparisonReport>, AppError> {
    let CompareRequest {
        records,
        field_specs,
        policy,
    } = payload;

    let field_specs = field_specs.unwrap_or_else(default_field_specs);
    let report = match policy {
        Some(document) => {
            let policy = WeightedPolicy::from_document(document)?;
            let engine = ComparisonEngine::new(state.engine.max_compared(), Arc::new(policy));
            engine.compare(&records, &field_specs, Utc::now())?
        }
        None => state.engine.compare(&records, &field_specs, Utc::now())?,
    };

    Ok(Json(report))
}
