use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::counter::NimCounterStore;
use super::domain::{CandidateId, RegistrationSubmission};
use super::repository::{CandidateRecord, CandidateRepository};
use super::service::{AdmissionError, AdmissionService};

/// Upper bound on how many waiting candidates one listing returns.
const PENDING_PAGE_LIMIT: usize = 50;

/// Router builder exposing HTTP endpoints for registration and approval.
pub fn admission_router<R, C>(service: Arc<AdmissionService<R, C>>) -> Router
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/admission/candidates",
            post(register_handler::<R, C>),
        )
        .route(
            "/api/v1/admission/candidates/:candidate_id",
            get(status_handler::<R, C>),
        )
        .route(
            "/api/v1/admission/candidates/:candidate_id/approve",
            post(approve_handler::<R, C>),
        )
        .route("/api/v1/admission/pending", get(pending_handler::<R, C>))
        .route("/api/v1/admission/programs", get(programs_handler::<R, C>))
        .with_state(service)
}

pub(crate) async fn register_handler<R, C>(
    State(service): State<Arc<AdmissionService<R, C>>>,
    axum::Json(submission): axum::Json<RegistrationSubmission>,
) -> Response
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    match service.register(submission) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<R, C>(
    State(service): State<Arc<AdmissionService<R, C>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    let id = CandidateId(candidate_id);
    match service.approve(&id) {
        Ok(nim) => {
            let payload = json!({
                "candidate_id": id.0,
                "nim": nim,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, C>(
    State(service): State<Arc<AdmissionService<R, C>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    let id = CandidateId(candidate_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pending_handler<R, C>(
    State(service): State<Arc<AdmissionService<R, C>>>,
) -> Response
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    match service.pending(PENDING_PAGE_LIMIT) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(CandidateRecord::status_view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn programs_handler<R, C>(
    State(service): State<Arc<AdmissionService<R, C>>>,
) -> Response
where
    R: CandidateRepository + 'static,
    C: NimCounterStore + 'static,
{
    (
        StatusCode::OK,
        axum::Json(service.catalog().programs().to_vec()),
    )
        .into_response()
}

fn error_response(error: AdmissionError) -> Response {
    let status = match &error {
        AdmissionError::NotFound => StatusCode::NOT_FOUND,
        AdmissionError::InvalidStateTransition { .. }
        | AdmissionError::Overflow(_)
        | AdmissionError::InvalidPartition(_)
        | AdmissionError::EmailTaken => StatusCode::CONFLICT,
        AdmissionError::UnknownProgram(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
