use crate::cli::ServeArgs;
use crate::infra::{load_practice, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gstdesk::config::AppConfig;
use gstdesk::error::AppError;
use gstdesk::telemetry;
use gstdesk::workflows::deadlines::{
    ComplianceApi, ComplianceEngine, InMemoryEntityStore, SystemClock,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = match args.snapshot.as_deref() {
        Some(path) => {
            let loaded = load_practice(path, args.returns_csv.as_deref())?;
            for row in &loaded.rejected {
                warn!(line = row.line, reason = %row.reason, "portal row not imported");
            }
            loaded.store
        }
        None => InMemoryEntityStore::new(),
    };

    let engine = Arc::new(ComplianceEngine::new(Arc::new(store), config.engine.clone()));
    let api = ComplianceApi::new(engine, Arc::new(SystemClock));

    let app = with_operational_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "gst compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
