use crate::cli::ServeArgs;
use crate::infra::{
    comparison_engine, policy_from_file, AppState, CompareState, InMemorySessionStore,
};
use crate::routes::with_evaluation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tender_eval::config::AppConfig;
use tender_eval::error::AppError;
use tender_eval::evaluation::EvaluationService;
use tender_eval::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };
    let policy = match &config.engine.policy_path {
        Some(path) => Some(policy_from_file(path)?),
        None => None,
    };
    let compare_state = CompareState {
        engine: Arc::new(comparison_engine(config.engine.max_compared, policy)),
    };

    let store = Arc::new(InMemorySessionStore::default());
    let evaluation_service = Arc::new(EvaluationService::new(store));

    let app = with_evaluation_routes(evaluation_service)
        .layer(Extension(app_state))
        .layer(Extension(compare_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tender evaluation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
