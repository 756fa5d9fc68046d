use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::encoder::FeatureEncoder;
use super::error::TrainingError;
use super::model::GradientBoostedClassifier;
use super::training::{self, TrainingParams, TrainingReport, TrainingSet};

/// An encoder and classifier fitted together. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    version: u64,
    trained_at: DateTime<Utc>,
    encoder: FeatureEncoder,
    classifier: GradientBoostedClassifier,
    report: TrainingReport,
}

impl ModelSnapshot {
    /// Pair an encoder with a classifier trained on its output width.
    pub fn new(
        encoder: FeatureEncoder,
        classifier: GradientBoostedClassifier,
        report: TrainingReport,
    ) -> Result<Self, TrainingError> {
        if encoder.width() != classifier.n_features() {
            return Err(TrainingError::ShapeMismatch {
                expected: encoder.width(),
                found: classifier.n_features(),
            });
        }

        Ok(Self {
            version: 0,
            trained_at: Utc::now(),
            encoder,
            classifier,
            report,
        })
    }

    /// Zero until the snapshot is published to a registry.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn classifier(&self) -> &GradientBoostedClassifier {
        &self.classifier
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            version: self.version,
            trained_at: self.trained_at,
            feature_count: self.encoder.width(),
            tree_count: self.classifier.tree_count(),
            report: self.report.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub feature_count: usize,
    pub tree_count: usize,
    pub report: TrainingReport,
}

/// Holds the published snapshot. Readers clone the `Arc` and keep scoring against it even if
/// a newer snapshot is published mid-request.
#[derive(Debug)]
pub struct ModelRegistry {
    current: RwLock<Arc<ModelSnapshot>>,
    training: Mutex<()>,
}

impl ModelRegistry {
    /// Publish `initial` as version 1.
    pub fn new(mut initial: ModelSnapshot) -> Self {
        initial.version = 1;
        Self {
            current: RwLock::new(Arc::new(initial)),
            training: Mutex::new(()),
        }
    }

    /// Train on `dataset` and publish the result as version 1.
    pub fn bootstrap(dataset: &TrainingSet, params: &TrainingParams) -> Result<Self, TrainingError> {
        let snapshot = training::train(dataset, params)?;
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_version(&self) -> u64 {
        self.snapshot().version
    }

    /// Atomically replace the published snapshot, returning the new one.
    pub fn publish(&self, mut snapshot: ModelSnapshot) -> Arc<ModelSnapshot> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.version = current.version + 1;
        let published = Arc::new(snapshot);
        *current = Arc::clone(&published);
        info!(version = published.version, "model snapshot published");
        published
    }

    /// Train a replacement and publish it. Only one run may be active; a failed run leaves the
    /// current snapshot untouched.
    pub fn retrain(
        &self,
        dataset: &TrainingSet,
        params: &TrainingParams,
    ) -> Result<Arc<ModelSnapshot>, TrainingError> {
        let _guard = match self.training.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(TrainingError::InProgress),
        };

        match training::train(dataset, params) {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(err) => {
                warn!(error = %err, version = self.current_version(), "retraining failed, keeping current snapshot");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::training::fixtures::credit_driven_set;

    fn quick_params() -> TrainingParams {
        let mut params = TrainingParams::default();
        params.boosting.n_estimators = 10;
        params
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::bootstrap(&credit_driven_set(40), &quick_params()).expect("bootstrap trains")
    }

    #[test]
    fn bootstrap_publishes_version_one() {
        let registry = registry();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.version(), 1);
        assert_eq!(snapshot.encoder().width(), snapshot.classifier().n_features());

        let summary = snapshot.summary();
        assert_eq!(summary.tree_count, 10);
        assert_eq!(summary.feature_count, snapshot.encoder().width());
    }

    #[test]
    fn retrain_swaps_without_disturbing_readers() {
        let registry = registry();
        let in_flight = registry.snapshot();

        let published = registry
            .retrain(&credit_driven_set(60), &quick_params())
            .expect("retrain succeeds");

        assert_eq!(published.version(), 2);
        assert_eq!(registry.current_version(), 2);
        assert_eq!(in_flight.version(), 1);
        assert_eq!(in_flight.report().training_rows, 32);
    }

    #[test]
    fn failed_retrain_keeps_current_snapshot() {
        let registry = registry();
        let result = registry.retrain(&TrainingSet::default(), &quick_params());

        assert!(matches!(result, Err(TrainingError::EmptyDataset)));
        assert_eq!(registry.current_version(), 1);
    }

    #[test]
    fn concurrent_retrain_is_refused() {
        let registry = registry();
        let _running = registry.training.lock().expect("lock training");

        assert!(matches!(
            registry.retrain(&credit_driven_set(40), &quick_params()),
            Err(TrainingError::InProgress)
        ));
        assert_eq!(registry.current_version(), 1);
    }

    #[test]
    fn mismatched_widths_are_rejected() {
        let donor = registry().snapshot();
        let narrow = ModelRegistry::bootstrap(&credit_driven_set(40), &quick_params())
            .expect("bootstrap trains")
            .snapshot();
        assert!(ModelSnapshot::new(
            narrow.encoder().clone(),
            donor.classifier().clone(),
            donor.report().clone(),
        )
        .is_ok());

        let mut rows = credit_driven_set(40).rows().to_vec();
        for row in rows.iter_mut().step_by(2) {
            row.applicant.marital_status = "Single".to_string();
        }
        let wider = training::train(&TrainingSet::new(rows), &quick_params()).expect("trains");
        assert!(matches!(
            ModelSnapshot::new(
                wider.encoder().clone(),
                donor.classifier().clone(),
                donor.report().clone(),
            ),
            Err(TrainingError::ShapeMismatch { .. })
        ));
    }
}
