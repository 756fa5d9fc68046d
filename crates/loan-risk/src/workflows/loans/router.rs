use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Map, Value};

use super::domain::{LoanId, LoanSubmission, StatusUpdate};
use super::repository::{LoanRepository, RepositoryError};
use super::service::{LoanApplicationService, LoanServiceError};

const PENDING_PAGE: usize = 50;

/// Router exposing stateless scoring and loan case endpoints.
pub fn loan_router<R>(service: Arc<LoanApplicationService<R>>) -> Router
where
    R: LoanRepository + 'static,
{
    Router::new()
        .route("/api/v1/risk/assess", post(assess_handler::<R>))
        .route(
            "/api/v1/loans",
            post(submit_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/loans/pending", get(pending_handler::<R>))
        .route("/api/v1/loans/:loan_id", get(loan_handler::<R>))
        .route("/api/v1/loans/:loan_id/status", put(status_handler::<R>))
        .with_state(service)
}

pub(crate) async fn assess_handler<R>(
    State(service): State<Arc<LoanApplicationService<R>>>,
    axum::Json(fields): axum::Json<Map<String, Value>>,
) -> Response
where
    R: LoanRepository + 'static,
{
    match service.assess(&fields) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<LoanApplicationService<R>>>,
    axum::Json(payload): axum::Json<Map<String, Value>>,
) -> Response
where
    R: LoanRepository + 'static,
{
    match service.submit(LoanSubmission::from_payload(payload)) {
        Ok(loan) => (StatusCode::CREATED, axum::Json(loan)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<LoanApplicationService<R>>>,
) -> Response
where
    R: LoanRepository + 'static,
{
    match service.list() {
        Ok(loans) => {
            let summaries: Vec<_> = loans.iter().map(|loan| loan.summary()).collect();
            (StatusCode::OK, axum::Json(summaries)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pending_handler<R>(
    State(service): State<Arc<LoanApplicationService<R>>>,
) -> Response
where
    R: LoanRepository + 'static,
{
    match service.pending(PENDING_PAGE) {
        Ok(loans) => {
            let summaries: Vec<_> = loans.iter().map(|loan| loan.summary()).collect();
            (StatusCode::OK, axum::Json(summaries)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn loan_handler<R>(
    State(service): State<Arc<LoanApplicationService<R>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
{
    match service.get(&LoanId(loan_id)) {
        Ok(loan) => (StatusCode::OK, axum::Json(loan)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<LoanApplicationService<R>>>,
    Path(loan_id): Path<String>,
    axum::Json(update): axum::Json<StatusUpdate>,
) -> Response
where
    R: LoanRepository + 'static,
{
    match service.update_status(&LoanId(loan_id), update) {
        Ok(loan) => (StatusCode::OK, axum::Json(loan)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: LoanServiceError) -> Response {
    match error {
        LoanServiceError::Assessment(error) => {
            let payload = json!({
                "error": error.to_string(),
                "field": error.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        LoanServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({
                "error": "loan not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        LoanServiceError::InvalidTransition { from, to } => {
            let payload = json!({
                "error": format!("loan is {from} and cannot move to {to}"),
                "status": from,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        LoanServiceError::Repository(RepositoryError::StatusChanged { current }) => {
            let payload = json!({
                "error": "loan status changed concurrently, retry the decision",
                "status": current,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
