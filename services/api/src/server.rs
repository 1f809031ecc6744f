use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryBlockedDateRepository, InMemoryReservationRepository};
use crate::routes::with_engine_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use bookaway::config::AppConfig;
use bookaway::error::AppError;
use bookaway::reservations::ReservationService;
use bookaway::telemetry;
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

    let reservations = Arc::new(InMemoryReservationRepository::default());
    let blocked_days = Arc::new(InMemoryBlockedDateRepository::default());
    let reservation_service = Arc::new(ReservationService::new(reservations, blocked_days));

    let app = with_engine_routes(reservation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "reservation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
