use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryLoanRepository, TrainingSource};
use crate::routes::with_loan_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_risk::config::AppConfig;
use loan_risk::error::AppError;
use loan_risk::scoring::{ModelRegistry, TrainingSet};
use loan_risk::telemetry;
use loan_risk::workflows::loans::LoanApplicationService;
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
    if let Some(path) = args.training_data.take() {
        config.model.training_data = path;
    }

    telemetry::init(&config.telemetry)?;

    let training = Arc::new(TrainingSource {
        path: config.model.training_data.clone(),
        params: config.model.training_params(),
    });
    let bootstrap_source = training.clone();
    let registry = tokio::task::spawn_blocking(move || {
        let dataset = TrainingSet::from_path(&bootstrap_source.path)?;
        ModelRegistry::bootstrap(&dataset, &bootstrap_source.params)
    })
    .await
    .map_err(|err| AppError::Server(axum::Error::new(err)))??;
    let registry = Arc::new(registry);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        registry: registry.clone(),
        training,
    };

    let engine = Arc::new(config.model.engine(registry));
    let repository = Arc::new(InMemoryLoanRepository::default());
    let loan_service = Arc::new(LoanApplicationService::new(repository, engine));

    let app = with_loan_routes(loan_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan risk service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
