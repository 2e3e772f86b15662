use crate::cli::ServeArgs;
use crate::infra::{build_cors_layer, AppState};
use crate::routes::application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use counsel::admin::AdminState;
use counsel::assessment::AssessmentService;
use counsel::auth::jwt::JwtKeys;
use counsel::auth::service::AuthService;
use counsel::booking::BookingCoordinator;
use counsel::config::AppConfig;
use counsel::error::AppError;
use counsel::store::SqliteStore;
use counsel::telemetry;
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

    let store = Arc::new(SqliteStore::open(config.database.path.as_path())?);
    let keys = JwtKeys::new(&config.auth.jwt_secret, config.auth.token_expiry_minutes);
    let auth = Arc::new(AuthService::new(Arc::clone(&store), keys));
    let assessments = Arc::new(AssessmentService::new(Arc::clone(&store)));
    let booking = Arc::new(BookingCoordinator::new(Arc::clone(&store)));
    let admin = AdminState::new(auth, Arc::clone(&assessments), Arc::clone(&booking));

    let cors = build_cors_layer(&config.cors)?;
    let app = application_routes(assessments, booking, admin)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "guidance counseling service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
