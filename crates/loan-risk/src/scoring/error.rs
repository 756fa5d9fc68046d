use super::applicant::ApplicantField;

/// Failures local to a single assessment call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssessmentError {
    #[error("missing required field `{0}`")]
    MissingField(ApplicantField),
    #[error("field `{field}` must be a {expected}")]
    InvalidType {
        field: ApplicantField,
        expected: &'static str,
    },
    #[error("field `{field}` value {value} is outside its permitted range")]
    OutOfRange { field: ApplicantField, value: f64 },
    #[error("field `{field}` has category `{value}` that was not seen during training")]
    UnknownCategory {
        field: ApplicantField,
        value: String,
    },
    #[error("field `{0}` is zero so the ratio is undefined")]
    DivideByZeroRisk(ApplicantField),
}

impl AssessmentError {
    /// Applicant field the error refers to, for transport-level error payloads.
    pub fn field(&self) -> ApplicantField {
        match self {
            AssessmentError::MissingField(field)
            | AssessmentError::DivideByZeroRisk(field)
            | AssessmentError::InvalidType { field, .. }
            | AssessmentError::OutOfRange { field, .. }
            | AssessmentError::UnknownCategory { field, .. } => *field,
        }
    }
}

/// Failures of an offline training run. None of these touch the published snapshot.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("training dataset is empty")]
    EmptyDataset,
    #[error("training labels contain a single class; both defaulted and repaid loans are required")]
    SingleClass,
    #[error("row {row}: {source}")]
    InvalidRecord {
        row: usize,
        #[source]
        source: AssessmentError,
    },
    #[error("row {row}: unrecognised default label `{value}`")]
    InvalidLabel { row: usize, value: String },
    #[error("feature width {found} does not match expected width {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("boosting parameter `{param}` has invalid value {value}")]
    InvalidParams { param: &'static str, value: f64 },
    #[error("a training run is already in progress")]
    InProgress,
    #[error("failed to read training data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid training CSV: {0}")]
    Csv(#[from] csv::Error),
}
