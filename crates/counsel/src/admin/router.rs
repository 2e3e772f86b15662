use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use crate::assessment::domain::AnalyticsPeriod;
use crate::assessment::service::{AssessmentError, AssessmentService};
use crate::auth::extract::AuthenticatedCounselor;
use crate::auth::jwt::JwtKeys;
use crate::auth::service::{AuthService, NewCounselor};
use crate::booking::domain::AppointmentStatus;
use crate::booking::router::booking_error_response;
use crate::booking::service::BookingCoordinator;
use crate::error::store_error_response;
use crate::store::CounselStore;

/// Shared state for the admin routes. `JwtKeys` is extracted via `FromRef`
/// so the authentication extractor works against this state type.
pub struct AdminState<S> {
    pub auth: Arc<AuthService<S>>,
    pub assessments: Arc<AssessmentService<S>>,
    pub booking: Arc<BookingCoordinator<S>>,
    keys: JwtKeys,
}

impl<S> AdminState<S>
where
    S: CounselStore + 'static,
{
    pub fn new(
        auth: Arc<AuthService<S>>,
        assessments: Arc<AssessmentService<S>>,
        booking: Arc<BookingCoordinator<S>>,
    ) -> Self {
        let keys = auth.keys();
        Self {
            auth,
            assessments,
            booking,
            keys,
        }
    }
}

// Derived Clone would require S: Clone.
impl<S> Clone for AdminState<S> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            assessments: Arc::clone(&self.assessments),
            booking: Arc::clone(&self.booking),
            keys: self.keys.clone(),
        }
    }
}

impl<S> FromRef<AdminState<S>> for JwtKeys {
    fn from_ref(state: &AdminState<S>) -> Self {
        state.keys.clone()
    }
}

pub fn admin_router<S>(state: AdminState<S>) -> Router
where
    S: CounselStore + 'static,
{
    Router::new()
        .route("/admin/login", post(login_handler::<S>))
        .route("/admin/assessments", get(assessments_handler::<S>))
        .route(
            "/admin/appointment/:appointment_id",
            get(appointment_detail_handler::<S>),
        )
        .route(
            "/admin/appointment/:appointment_id/status",
            put(update_status_handler::<S>),
        )
        .route("/admin/appointments", get(counselor_appointments_handler::<S>))
        .route(
            "/admin/slots",
            get(list_slots_handler::<S>).post(create_slot_handler::<S>),
        )
        .route("/admin/slots/:slot_id", delete(delete_slot_handler::<S>))
        .route(
            "/admin/counselors",
            get(list_counselors_handler::<S>).post(create_counselor_handler::<S>),
        )
        .route(
            "/admin/counselors/:counselor_id",
            delete(delete_counselor_handler::<S>),
        )
        .route("/admin/dashboard/stats", get(dashboard_stats_handler::<S>))
        .route("/admin/analytics", get(analytics_handler::<S>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingQuery {
    #[serde(default)]
    pub skip: u32,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub counselor_notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentsQuery {
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotCreateRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateCounselorRequest {
    pub full_name: String,
    pub email: String,
    pub employee_id: String,
    pub specialization: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyticsQuery {
    pub period: Option<String>,
}

pub(crate) async fn login_handler<S>(
    State(state): State<AdminState<S>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.auth.login(&request.email, &request.password) {
        Ok(outcome) => {
            let payload = json!({
                "access_token": outcome.token,
                "token_type": "bearer",
                "counselor_id": outcome.counselor.counselor_id,
                "full_name": outcome.counselor.full_name,
                "email": outcome.counselor.email,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn assessments_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    Query(query): Query<ListingQuery>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.assessments.recent_submissions(query.skip, query.limit) {
        Ok(submissions) => (StatusCode::OK, axum::Json(submissions)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

async fn appointment_detail_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    Path(appointment_id): Path<String>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.booking.appointment_detail(&appointment_id) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn update_status_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    Path(appointment_id): Path<String>,
    axum::Json(request): axum::Json<StatusUpdateRequest>,
) -> Response
where
    S: CounselStore + 'static,
{
    let notes = request.counselor_notes.unwrap_or_default();
    let reason = request.rejection_reason.unwrap_or_default();
    match state
        .booking
        .update_status(&appointment_id, request.status, &notes, &reason)
    {
        Ok(update) => {
            let payload = json!({
                "message": "Appointment status updated successfully",
                "appointment_id": update.appointment_id,
                "status": update.status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => booking_error_response(&error),
    }
}

async fn counselor_appointments_handler<S>(
    State(state): State<AdminState<S>>,
    counselor: AuthenticatedCounselor,
    Query(query): Query<AppointmentsQuery>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state
        .booking
        .counselor_appointments(&counselor.counselor_id, query.status)
    {
        Ok(appointments) => (StatusCode::OK, axum::Json(appointments)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn create_slot_handler<S>(
    State(state): State<AdminState<S>>,
    counselor: AuthenticatedCounselor,
    axum::Json(request): axum::Json<SlotCreateRequest>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.booking.create_time_slot(
        &counselor.counselor_id,
        request.date,
        request.start_time,
        request.end_time,
    ) {
        Ok(record) => {
            let payload = json!({
                "message": "Time slot created successfully",
                "slot_id": record.slot_id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => booking_error_response(&error),
    }
}

async fn list_slots_handler<S>(
    State(state): State<AdminState<S>>,
    counselor: AuthenticatedCounselor,
    Query(query): Query<SlotRangeQuery>,
) -> Response
where
    S: CounselStore + 'static,
{
    let range = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };
    match state.booking.list_time_slots(&counselor.counselor_id, range) {
        Ok(slots) => (StatusCode::OK, axum::Json(slots)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn delete_slot_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    Path(slot_id): Path<String>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.booking.delete_time_slot(&slot_id) {
        Ok(()) => {
            let payload = json!({
                "message": "Time slot deleted successfully",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => booking_error_response(&error),
    }
}

async fn list_counselors_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.auth.list_counselors() {
        Ok(counselors) => (StatusCode::OK, axum::Json(counselors)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn create_counselor_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    axum::Json(request): axum::Json<CreateCounselorRequest>,
) -> Response
where
    S: CounselStore + 'static,
{
    let new = NewCounselor {
        full_name: request.full_name,
        email: request.email,
        employee_id: request.employee_id,
        specialization: request.specialization,
        password: request.password,
    };
    match state.auth.create_counselor(new) {
        Ok(profile) => {
            let payload = json!({
                "message": "Counselor created successfully",
                "counselor_id": profile.counselor_id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_counselor_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    Path(counselor_id): Path<String>,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.auth.delete_counselor(&counselor_id) {
        Ok(()) => {
            let payload = json!({
                "message": "Counselor deleted successfully",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn dashboard_stats_handler<S>(
    State(state): State<AdminState<S>>,
    counselor: AuthenticatedCounselor,
) -> Response
where
    S: CounselStore + 'static,
{
    match state.booking.dashboard_stats(&counselor.counselor_id) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

async fn analytics_handler<S>(
    State(state): State<AdminState<S>>,
    _counselor: AuthenticatedCounselor,
    Query(query): Query<AnalyticsQuery>,
) -> Response
where
    S: CounselStore + 'static,
{
    let period = AnalyticsPeriod::parse(query.period.as_deref().unwrap_or("7days"));
    match state.assessments.analytics(period) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

fn assessment_error_response(error: AssessmentError) -> Response {
    match error {
        AssessmentError::Scoring(scoring) => {
            let payload = json!({
                "error": scoring.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        AssessmentError::Store(store) => store_error_response(&store),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::password::hash_with_iterations;
    use crate::booking::appointment_router;
    use crate::store::MemoryStore;

    use super::*;

    fn test_state() -> AdminState<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let keys = JwtKeys::new("test-secret", 60);
        let auth = Arc::new(AuthService::with_hasher(
            Arc::clone(&store),
            keys,
            |password| hash_with_iterations(password, 1_000),
        ));
        let assessments = Arc::new(AssessmentService::new(Arc::clone(&store)));
        let booking = Arc::new(BookingCoordinator::new(store));
        AdminState::new(auth, assessments, booking)
    }

    fn router_with_booking(state: &AdminState<MemoryStore>) -> Router {
        admin_router(state.clone()).merge(appointment_router(Arc::clone(&state.booking)))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    fn json_post(uri: &str, payload: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    async fn login(router: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(json_post(
                "/admin/login",
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    fn seed_account(state: &AdminState<MemoryStore>, email: &str) -> String {
        state
            .auth
            .create_counselor(NewCounselor {
                full_name: "Ana Reyes".to_string(),
                email: email.to_string(),
                employee_id: "EMP-7".to_string(),
                specialization: "Stress Management".to_string(),
                password: "correct horse".to_string(),
            })
            .expect("account seeds")
            .counselor_id
    }

    #[tokio::test]
    async fn login_returns_a_bearer_token() {
        let state = test_state();
        seed_account(&state, "ana@example.edu");
        let router = admin_router(state);

        let (status, body) = login(&router, "ana@example.edu", "correct horse").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], json!("bearer"));
        assert!(body["access_token"].as_str().is_some());
        assert_eq!(body["email"], json!("ana@example.edu"));

        let (bad_status, _) = login(&router, "ana@example.edu", "wrong").await;
        assert_eq!(bad_status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let state = test_state();
        let router = admin_router(state);

        let response = router
            .oneshot(
                Request::get("/admin/dashboard/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_authenticate = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .expect("challenge header present");
        assert_eq!(www_authenticate, "Bearer");
    }

    #[tokio::test]
    async fn slot_creation_and_booking_conflict_over_http() {
        let state = test_state();
        seed_account(&state, "ana@example.edu");
        let router = router_with_booking(&state);

        let (_, login_body) = login(&router, "ana@example.edu", "correct horse").await;
        let token = login_body["access_token"].as_str().unwrap().to_string();

        let response = router
            .clone()
            .oneshot(
                Request::post("/admin/slots")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "date": "2026-09-07",
                            "start_time": "09:00:00",
                            "end_time": "10:00:00",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let slot_body = body_json(response).await;
        let slot_id = slot_body["slot_id"].as_str().unwrap().to_string();

        // Submit an assessment directly so a booking can reference it.
        let submission = state
            .assessments
            .submit(crate::assessment::scoring::AssessmentAnswers {
                section1: (1..=10).map(|n| (format!("q{n}"), 2)).collect(),
                section2: (1..=10).map(|n| (format!("q{n}"), 1)).collect(),
                section3: (1..=10).map(|n| (format!("q{n}"), 2)).collect(),
            })
            .expect("submission stores");
        let counselor_id = login_body["counselor_id"].as_str().unwrap();

        let book = |email: &str| {
            json_post(
                "/appointment/book",
                json!({
                    "submission_id": submission.submission_id,
                    "counselor_id": counselor_id,
                    "slot_id": slot_id,
                    "client_details": {
                        "full_name": "Jamie Cruz",
                        "email": email,
                        "course": "BS Psychology",
                        "year_level": "3rd Year",
                        "gender": "female",
                        "age": 20,
                    },
                }),
            )
        };

        let first = router.clone().oneshot(book("jamie@example.edu")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let booked = body_json(first).await;
        assert_eq!(booked["status"], json!("Pending"));
        assert_eq!(booked["message"], json!("Appointment booked successfully."));

        let second = router.clone().oneshot(book("other@example.edu")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        // Occupied slot refuses deletion.
        let delete = router
            .clone()
            .oneshot(
                Request::delete(format!("/admin/slots/{slot_id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(delete.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_appointment_detail_is_not_found() {
        let state = test_state();
        seed_account(&state, "ana@example.edu");
        let router = admin_router(state);

        let (_, login_body) = login(&router, "ana@example.edu", "correct horse").await;
        let token = login_body["access_token"].as_str().unwrap();

        let response = router
            .oneshot(
                Request::get("/admin/appointment/missing")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analytics_defaults_to_the_seven_day_window() {
        use chrono::{Duration, Utc};

        use crate::assessment::domain::SubmissionRecord;
        use crate::assessment::scoring::StressLevel;
        use crate::store::CounselStore;

        let store = Arc::new(MemoryStore::new());
        let keys = JwtKeys::new("test-secret", 60);
        let auth = Arc::new(AuthService::with_hasher(
            Arc::clone(&store),
            keys,
            |password| hash_with_iterations(password, 1_000),
        ));
        let assessments = Arc::new(AssessmentService::new(Arc::clone(&store)));
        let booking = Arc::new(BookingCoordinator::new(Arc::clone(&store)));
        let state = AdminState::new(auth, assessments, booking);
        seed_account(&state, "ana@example.edu");

        state
            .assessments
            .submit(crate::assessment::scoring::AssessmentAnswers {
                section1: (1..=10).map(|n| (format!("q{n}"), 2)).collect(),
                section2: (1..=10).map(|n| (format!("q{n}"), 1)).collect(),
                section3: (1..=10).map(|n| (format!("q{n}"), 2)).collect(),
            })
            .expect("recent submission stores");

        let last_month = SubmissionRecord {
            submission_id: "sub-old".to_string(),
            submitted_at: Utc::now() - Duration::days(30),
            section1_answers: (1..=10).map(|n| (format!("q{n}"), 1)).collect(),
            section2_answers: (1..=10).map(|n| (format!("q{n}"), 1)).collect(),
            section3_answers: (1..=10).map(|n| (format!("q{n}"), 1)).collect(),
            section1_score: 1.0,
            section2_score: 1.0,
            section3_score: 1.4,
            overall_score: 1.13,
            stress_level: StressLevel::Low,
            recommendation: "older record".to_string(),
        };
        store
            .insert_submission(&last_month)
            .expect("older submission stores");

        let router = admin_router(state);
        let (_, login_body) = login(&router, "ana@example.edu", "correct horse").await;
        let token = login_body["access_token"].as_str().unwrap().to_string();

        let get = |uri: &str| {
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let windowed = router.clone().oneshot(get("/admin/analytics")).await.unwrap();
        assert_eq!(windowed.status(), StatusCode::OK);
        let body = body_json(windowed).await;
        assert_eq!(body["total_assessments"], json!(1));

        let all = router
            .clone()
            .oneshot(get("/admin/analytics?period=all"))
            .await
            .unwrap();
        let body = body_json(all).await;
        assert_eq!(body["total_assessments"], json!(2));
    }

    #[tokio::test]
    async fn counselor_accounts_can_be_managed_over_http() {
        let state = test_state();
        seed_account(&state, "ana@example.edu");
        let router = admin_router(state);

        let (_, login_body) = login(&router, "ana@example.edu", "correct horse").await;
        let token = login_body["access_token"].as_str().unwrap().to_string();

        let create = router
            .clone()
            .oneshot(
                Request::post("/admin/counselors")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "full_name": "Ben Cruz",
                            "email": "ben@example.edu",
                            "employee_id": "EMP-8",
                            "specialization": "Career Guidance",
                            "password": "another horse",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(create.status(), StatusCode::OK);
        let created = body_json(create).await;
        let new_id = created["counselor_id"].as_str().unwrap().to_string();

        let list = router
            .clone()
            .oneshot(
                Request::get("/admin/counselors")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = body_json(list).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
        // Credential hashes never leave the service.
        assert!(listed[0].get("password_hash").is_none());

        let delete = router
            .clone()
            .oneshot(
                Request::delete(format!("/admin/counselors/{new_id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(delete.status(), StatusCode::OK);

        let delete_again = router
            .clone()
            .oneshot(
                Request::delete(format!("/admin/counselors/{new_id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(delete_again.status(), StatusCode::NOT_FOUND);
    }
}
