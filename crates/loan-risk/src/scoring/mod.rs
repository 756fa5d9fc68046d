//! Applicant scoring: validation, feature encoding, the default-probability model and the
//! weighted risk composer, tied together by [`RiskEngine`].

pub mod applicant;
pub mod composer;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod model;
pub mod rating;
pub mod snapshot;
pub mod training;

pub use applicant::{ApplicantField, ApplicantRecord};
pub use composer::{
    PolicyError, Recommendation, RiskBreakdown, RiskComponentKind, RiskComposer, RiskLevel,
    RiskVerdict, RiskWeights, UnderwritingBands,
};
pub use encoder::{EncodedFeatures, EncodingStrictness, FeatureEncoder};
pub use engine::{RiskAssessment, RiskEngine};
pub use error::{AssessmentError, TrainingError};
pub use model::{BoostingParams, GradientBoostedClassifier};
pub use rating::{RiskCategory, RiskRating, RiskRatingPolicy};
pub use snapshot::{ModelRegistry, ModelSnapshot, SnapshotSummary};
pub use training::{train, LabeledApplicant, TrainingParams, TrainingReport, TrainingSet};
