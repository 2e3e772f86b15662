use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::store_error_response;
use crate::store::CounselStore;

use super::questions::questionnaire;
use super::scoring::AssessmentAnswers;
use super::service::{AssessmentError, AssessmentService};

/// Public assessment endpoints: fetch the questionnaire, submit answers.
pub fn assessment_router<S>(service: Arc<AssessmentService<S>>) -> Router
where
    S: CounselStore + 'static,
{
    Router::new()
        .route("/assessment/questions", get(questions_handler))
        .route("/assessment/submit", post(submit_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentSubmitRequest {
    pub answers: AssessmentAnswers,
}

async fn questions_handler() -> Response {
    (StatusCode::OK, axum::Json(questionnaire())).into_response()
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<AssessmentService<S>>>,
    axum::Json(request): axum::Json<AssessmentSubmitRequest>,
) -> Response
where
    S: CounselStore + 'static,
{
    match service.submit(request.answers) {
        Ok(record) => {
            let payload = json!({
                "submission_id": record.submission_id,
                "section1_score": record.section1_score,
                "section2_score": record.section2_score,
                "section3_score": record.section3_score,
                "overall_score": record.overall_score,
                "stress_level": record.stress_level.label(),
                "recommendation": record.recommendation,
                "timestamp": record.submitted_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(AssessmentError::Scoring(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(AssessmentError::Store(error)) => store_error_response(&error),
    }
}
