use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::applicant::ApplicantRecord;
use super::composer::{RiskComposer, RiskVerdict};
use super::encoder::EncodingStrictness;
use super::error::AssessmentError;
use super::rating::{RiskRating, RiskRatingPolicy};
use super::snapshot::ModelRegistry;

/// Everything returned for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Snapshot that produced the probability.
    pub model_version: u64,
    #[serde(flatten)]
    pub verdict: RiskVerdict,
    pub rating: RiskRating,
}

/// Scores applicants against whichever snapshot is published when the call starts.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    registry: Arc<ModelRegistry>,
    composer: RiskComposer,
    rating: RiskRatingPolicy,
    strictness: EncodingStrictness,
}

impl RiskEngine {
    pub fn new(registry: Arc<ModelRegistry>, strictness: EncodingStrictness) -> Self {
        Self::with_policies(
            registry,
            strictness,
            RiskComposer::default(),
            RiskRatingPolicy::default(),
        )
    }

    pub fn with_policies(
        registry: Arc<ModelRegistry>,
        strictness: EncodingStrictness,
        composer: RiskComposer,
        rating: RiskRatingPolicy,
    ) -> Self {
        Self {
            registry,
            composer,
            rating,
            strictness,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn strictness(&self) -> EncodingStrictness {
        self.strictness
    }

    /// Parse, validate, encode, predict, compose and rate one applicant payload.
    pub fn assess(&self, fields: &Map<String, Value>) -> Result<RiskAssessment, AssessmentError> {
        let record = ApplicantRecord::from_fields(fields)?;
        self.assess_record(&record)
    }

    pub fn assess_record(&self, record: &ApplicantRecord) -> Result<RiskAssessment, AssessmentError> {
        let snapshot = self.registry.snapshot();
        let encoded = snapshot.encoder().encode(record, self.strictness)?;
        let probability = snapshot.classifier().predict_probability(&encoded);
        let verdict = self.composer.compose(record, probability);
        let rating = self.rating.rate(verdict.default_probability);

        debug!(
            model_version = snapshot.version(),
            probability = verdict.default_probability,
            risk_score = verdict.risk_score,
            recommendation = ?verdict.recommendation,
            "applicant assessed"
        );

        Ok(RiskAssessment {
            model_version: snapshot.version(),
            verdict,
            rating,
        })
    }
}
