use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::scoring::{
    BoostingParams, EncodingStrictness, ModelRegistry, PolicyError, RiskComposer, RiskEngine,
    RiskRatingPolicy, RiskWeights, TrainingError, TrainingParams, UnderwritingBands,
};

const DEFAULT_TRAINING_DATA: &str = "data/loan_history.csv";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            model: ModelConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the default model learns from, how it treats unseen categories, and the underwriting
/// policy its probabilities are blended under.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub training_data: PathBuf,
    pub strictness: EncodingStrictness,
    pub boosting: BoostingParams,
    pub weights: RiskWeights,
    pub bands: UnderwritingBands,
}

impl ModelConfig {
    fn load() -> Result<Self, ConfigError> {
        let training_data = env::var("LOAN_RISK_TRAINING_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TRAINING_DATA));

        let strictness = match env::var("LOAN_RISK_CATEGORY_MODE") {
            Ok(value) => EncodingStrictness::parse(&value)
                .ok_or(ConfigError::InvalidCategoryMode { value })?,
            Err(_) => EncodingStrictness::default(),
        };

        let defaults = BoostingParams::default();
        let boosting = BoostingParams {
            n_estimators: numeric_var("LOAN_RISK_ESTIMATORS", defaults.n_estimators)?,
            learning_rate: numeric_var("LOAN_RISK_LEARNING_RATE", defaults.learning_rate)?,
            max_depth: numeric_var("LOAN_RISK_MAX_DEPTH", defaults.max_depth)?,
            ..defaults
        };
        boosting
            .validate()
            .map_err(|source| ConfigError::InvalidBoosting { source })?;

        let weights = match env::var("LOAN_RISK_WEIGHTS") {
            Ok(value) => {
                let [model, credit, dti, tenure, lti] =
                    numeric_list::<5>("LOAN_RISK_WEIGHTS", value)?;
                RiskWeights::new(model, credit, dti, tenure, lti).map_err(|source| {
                    ConfigError::InvalidPolicy {
                        key: "LOAN_RISK_WEIGHTS",
                        source,
                    }
                })?
            }
            Err(_) => RiskWeights::default(),
        };

        let bands = match env::var("LOAN_RISK_BANDS") {
            Ok(value) => {
                let [review_from, reject_from] = numeric_list::<2>("LOAN_RISK_BANDS", value)?;
                UnderwritingBands::new(review_from, reject_from).map_err(|source| {
                    ConfigError::InvalidPolicy {
                        key: "LOAN_RISK_BANDS",
                        source,
                    }
                })?
            }
            Err(_) => UnderwritingBands::default(),
        };

        Ok(Self {
            training_data,
            strictness,
            boosting,
            weights,
            bands,
        })
    }

    pub fn composer(&self) -> RiskComposer {
        RiskComposer::new(self.weights.clone(), self.bands.clone())
    }

    /// Engine scoring against `registry` under the configured strictness and policy.
    pub fn engine(&self, registry: Arc<ModelRegistry>) -> RiskEngine {
        RiskEngine::with_policies(
            registry,
            self.strictness,
            self.composer(),
            RiskRatingPolicy::default(),
        )
    }

    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            boosting: self.boosting.clone(),
            ..TrainingParams::default()
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            training_data: PathBuf::from(DEFAULT_TRAINING_DATA),
            strictness: EncodingStrictness::default(),
            boosting: BoostingParams::default(),
            weights: RiskWeights::default(),
            bands: UnderwritingBands::default(),
        }
    }
}

fn numeric_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}

/// Comma-separated list of exactly `N` numbers.
fn numeric_list<const N: usize>(key: &'static str, value: String) -> Result<[f64; N], ConfigError> {
    let parsed: Result<Vec<f64>, _> = value.split(',').map(|part| part.trim().parse()).collect();
    match parsed.map(<[f64; N]>::try_from) {
        Ok(Ok(values)) => Ok(values),
        _ => Err(ConfigError::InvalidNumber { key, value }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidCategoryMode { value: String },
    InvalidBoosting { source: TrainingError },
    InvalidPolicy {
        key: &'static str,
        source: PolicyError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} has an invalid numeric value '{value}'")
            }
            ConfigError::InvalidCategoryMode { value } => write!(
                f,
                "LOAN_RISK_CATEGORY_MODE must be 'strict' or 'permissive' (found '{value}')"
            ),
            ConfigError::InvalidBoosting { source } => {
                write!(f, "invalid LOAN_RISK_* boosting settings: {source}")
            }
            ConfigError::InvalidPolicy { key, source } => write!(f, "{key} rejected: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidBoosting { source } => Some(source),
            ConfigError::InvalidPolicy { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidCategoryMode { .. } => None,
        }
    }
}
