use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use loan_risk::error::AppError;
use loan_risk::scoring::{SnapshotSummary, TrainingSet};
use loan_risk::workflows::loans::{loan_router, LoanApplicationService, LoanRepository};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub(crate) fn with_loan_routes<R>(service: Arc<LoanApplicationService<R>>) -> axum::Router
where
    R: LoanRepository + 'static,
{
    loan_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/model", axum::routing::get(model_endpoint))
        .route(
            "/api/v1/model/retrain",
            axum::routing::post(retrain_endpoint),
        )
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
        json!({ "status": "ready", "modelVersion": state.registry.current_version() })
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

pub(crate) async fn model_endpoint(Extension(state): Extension<AppState>) -> Json<SnapshotSummary> {
    Json(state.registry.snapshot().summary())
}

/// Refit from the configured history off the async workers, then publish.
pub(crate) async fn retrain_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<SnapshotSummary>, AppError> {
    let registry = state.registry.clone();
    let source = state.training.clone();

    let published = tokio::task::spawn_blocking(move || {
        let dataset = TrainingSet::from_path(&source.path)?;
        registry.retrain(&dataset, &source.params)
    })
    .await
    .map_err(|err| AppError::Server(axum::Error::new(err)))??;

    info!(version = published.version(), "retrained model published");
    Ok(Json(published.summary()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryLoanRepository, TrainingSource};
    use axum::body::Body;
    use axum::http::Request;
    use loan_risk::scoring::{EncodingStrictness, ModelRegistry, RiskEngine, TrainingParams};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    const HISTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/loan_history.csv");

    fn quick_params() -> TrainingParams {
        let mut params = TrainingParams::default();
        params.boosting.n_estimators = 20;
        params
    }

    fn state(training_path: PathBuf) -> AppState {
        let dataset = TrainingSet::from_path(HISTORY).expect("history loads");
        let registry = ModelRegistry::bootstrap(&dataset, &quick_params()).expect("bootstrap trains");
        AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            registry: Arc::new(registry),
            training: Arc::new(TrainingSource {
                path: training_path,
                params: quick_params(),
            }),
        }
    }

    fn app(state: AppState) -> axum::Router {
        let engine = Arc::new(RiskEngine::new(
            state.registry.clone(),
            EncodingStrictness::Strict,
        ));
        let service = Arc::new(LoanApplicationService::new(
            Arc::new(InMemoryLoanRepository::default()),
            engine,
        ));
        with_loan_routes(service).layer(Extension(state))
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let state = state(PathBuf::from(HISTORY));
        let readiness = state.readiness.clone();
        let router = app(state);

        let response = router
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        readiness.store(true, Ordering::Release);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["modelVersion"], json!(1));
    }

    #[tokio::test]
    async fn model_endpoint_describes_current_snapshot() {
        let router = app(state(PathBuf::from(HISTORY)));

        let response = router
            .oneshot(Request::get("/api/v1/model").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["version"], json!(1));
        assert_eq!(payload["treeCount"], json!(20));
        assert_eq!(payload["report"]["trainingRows"], json!(128));
        assert_eq!(payload["report"]["holdoutRows"], json!(32));
    }

    #[tokio::test]
    async fn retrain_publishes_next_version() {
        let state = state(PathBuf::from(HISTORY));
        let registry = state.registry.clone();
        let router = app(state);

        let response = router
            .oneshot(
                Request::post("/api/v1/model/retrain")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["version"], json!(2));
        assert_eq!(registry.current_version(), 2);
    }

    #[tokio::test]
    async fn failed_retrain_keeps_serving_current_model() {
        let state = state(PathBuf::from("does/not/exist.csv"));
        let registry = state.registry.clone();
        let router = app(state);

        let response = router
            .oneshot(
                Request::post("/api/v1/model/retrain")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(registry.current_version(), 1);
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
