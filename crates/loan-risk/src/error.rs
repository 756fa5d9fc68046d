use crate::config::ConfigError;
use crate::scoring::{AssessmentError, TrainingError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Training(TrainingError),
    Assessment(AssessmentError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Training(err) => write!(f, "training error: {}", err),
            AppError::Assessment(err) => write!(f, "assessment error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Training(err) => Some(err),
            AppError::Assessment(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Assessment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Training(TrainingError::InProgress) => StatusCode::CONFLICT,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<TrainingError> for AppError {
    fn from(value: TrainingError) -> Self {
        Self::Training(value)
    }
}

impl From<AssessmentError> for AppError {
    fn from(value: AssessmentError) -> Self {
        Self::Assessment(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ApplicantField;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (
                AppError::from(AssessmentError::MissingField(ApplicantField::Income)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(TrainingError::InProgress),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(TrainingError::SingleClass),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(ConfigError::InvalidPort),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn display_names_the_layer() {
        let error = AppError::from(AssessmentError::MissingField(ApplicantField::CreditScore));
        assert_eq!(
            error.to_string(),
            "assessment error: missing required field `creditScore`"
        );
    }
}
