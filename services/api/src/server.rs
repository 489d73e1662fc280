use crate::cli::ServeArgs;
use crate::infra::{seed_catalogue, seed_cycle, AppState, DEFAULT_CYCLE_RULE};
use crate::routes::with_evaluation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use peer_eval::config::AppConfig;
use peer_eval::error::AppError;
use peer_eval::evaluations::{
    CycleId, EvaluationService, InMemoryEvaluationStore, OrgPlatformClient,
};
use peer_eval::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let store = Arc::new(InMemoryEvaluationStore::new());
    seed_catalogue(store.as_ref())?;
    let cycle = seed_cycle(
        store.as_ref(),
        CycleId(1),
        Local::now().date_naive(),
        Some(DEFAULT_CYCLE_RULE),
    )?;

    let org = Arc::new(OrgPlatformClient::new(&config.org_platform)?);
    let evaluation_service = Arc::new(
        EvaluationService::new(store, org).with_fetch_timeout(config.org_platform.timeout),
    );

    let app = with_evaluation_routes(evaluation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        org_platform = %config.org_platform.api_base,
        cycle_id = %cycle.id,
        "peer evaluation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
