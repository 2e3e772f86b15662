use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use counsel::admin::{admin_router, AdminState};
use counsel::assessment::{assessment_router, AssessmentService};
use counsel::booking::{appointment_router, BookingCoordinator};
use counsel::store::CounselStore;
use serde_json::json;
use std::sync::Arc;

/// Compose the three domain routers with the operational endpoints.
pub(crate) fn application_routes<S>(
    assessments: Arc<AssessmentService<S>>,
    booking: Arc<BookingCoordinator<S>>,
    admin: AdminState<S>,
) -> axum::Router
where
    S: CounselStore + 'static,
{
    assessment_router(assessments)
        .merge(appointment_router(booking))
        .merge(admin_router(admin))
        .route("/", axum::routing::get(root))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Guidance and Counseling API",
        "status": "running",
    }))
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
