use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::error::store_error_response;
use crate::store::CounselStore;

use super::domain::BookingRequest;
use super::service::{BookingCoordinator, BookingError};

/// Public booking endpoints. No authentication: clients identify themselves
/// through the details they submit.
pub fn appointment_router<S>(coordinator: Arc<BookingCoordinator<S>>) -> Router
where
    S: CounselStore + 'static,
{
    Router::new()
        .route(
            "/appointment/counselors/available",
            get(available_counselors_handler::<S>),
        )
        .route("/appointment/book", post(book_handler::<S>))
        .route("/appointment/status/:email", get(status_handler::<S>))
        .with_state(coordinator)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailabilityQuery {
    pub date: Option<NaiveDate>,
}

pub(crate) fn booking_error_response(error: &BookingError) -> Response {
    match error {
        BookingError::TransitionDenied { .. } | BookingError::InvalidSlotInterval => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        BookingError::Store(store_error) => store_error_response(store_error),
    }
}

async fn available_counselors_handler<S>(
    State(coordinator): State<Arc<BookingCoordinator<S>>>,
    Query(query): Query<AvailabilityQuery>,
) -> Response
where
    S: CounselStore + 'static,
{
    match coordinator.available_counselors(query.date) {
        Ok(counselors) => (StatusCode::OK, axum::Json(counselors)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn book_handler<S>(
    State(coordinator): State<Arc<BookingCoordinator<S>>>,
    axum::Json(request): axum::Json<BookingRequest>,
) -> Response
where
    S: CounselStore + 'static,
{
    match coordinator.book_appointment(request) {
        Ok(booked) => {
            let payload = json!({
                "appointment_id": booked.appointment_id,
                "status": booked.status.label(),
                "scheduled_date": booked.scheduled_date,
                "scheduled_time": booked.scheduled_time,
                "counselor_name": booked.counselor_name,
                "message": "Appointment booked successfully.",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn status_handler<S>(
    State(coordinator): State<Arc<BookingCoordinator<S>>>,
    Path(email): Path<String>,
) -> Response
where
    S: CounselStore + 'static,
{
    match coordinator.status_by_email(&email) {
        Ok(appointments) if appointments.is_empty() => {
            let payload = json!({
                "error": "No appointments found for this email",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Ok(appointments) => (StatusCode::OK, axum::Json(appointments)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}
