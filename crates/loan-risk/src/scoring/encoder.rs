use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::applicant::{ApplicantField, ApplicantRecord};
use super::error::{AssessmentError, TrainingError};

/// How categories that were not observed at fit time are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingStrictness {
    /// Reject with [`AssessmentError::UnknownCategory`].
    #[default]
    Strict,
    /// Encode the unseen value as the all-zero (reference) row.
    Permissive,
}

impl EncodingStrictness {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "permissive" => Some(Self::Permissive),
            _ => None,
        }
    }
}

/// Per-field standardization captured at fit time.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericScale {
    pub field: ApplicantField,
    pub mean: f64,
    pub std_dev: f64,
}

impl NumericScale {
    fn fit(field: ApplicantField, values: &[f64]) -> Self {
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / count;
        let std_dev = variance.sqrt();

        Self {
            field,
            mean,
            // degenerate training column
            std_dev: if std_dev > 0.0 && std_dev.is_finite() {
                std_dev
            } else {
                1.0
            },
        }
    }

    pub fn standardize(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

/// Fitted one-hot vocabulary for one categorical field. The lexically first category is the
/// dropped reference and encodes as all zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryVocabulary {
    pub field: ApplicantField,
    pub reference: String,
    pub levels: Vec<String>,
}

enum CategorySlot {
    Reference,
    Level(usize),
    Unseen,
}

impl CategoryVocabulary {
    fn fit<'a>(field: ApplicantField, values: impl Iterator<Item = &'a str>) -> Self {
        let mut observed: Vec<String> = values
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let reference = if observed.is_empty() {
            String::new()
        } else {
            observed.remove(0)
        };

        Self {
            field,
            reference,
            levels: observed,
        }
    }

    fn slot(&self, value: &str) -> CategorySlot {
        if value == self.reference {
            return CategorySlot::Reference;
        }
        match self.levels.iter().position(|level| level == value) {
            Some(index) => CategorySlot::Level(index),
            None => CategorySlot::Unseen,
        }
    }
}

/// Model input for one assessment: standardized numerics followed by one-hot blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures(Vec<f64>);

impl EncodedFeatures {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fitted scaler and vocabulary. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEncoder {
    numeric: Vec<NumericScale>,
    categorical: Vec<CategoryVocabulary>,
}

impl FeatureEncoder {
    pub fn fit(records: &[&ApplicantRecord]) -> Result<Self, TrainingError> {
        if records.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }

        let numeric = ApplicantField::NUMERIC
            .iter()
            .enumerate()
            .map(|(column, field)| {
                let values: Vec<f64> = records
                    .iter()
                    .map(|record| record.numeric_values()[column].1)
                    .collect();
                NumericScale::fit(*field, &values)
            })
            .collect();

        let categorical = ApplicantField::CATEGORICAL
            .iter()
            .enumerate()
            .map(|(column, field)| {
                CategoryVocabulary::fit(
                    *field,
                    records
                        .iter()
                        .map(move |record| record.categorical_values()[column].1),
                )
            })
            .collect();

        Ok(Self {
            numeric,
            categorical,
        })
    }

    pub fn numeric_scales(&self) -> &[NumericScale] {
        &self.numeric
    }

    pub fn vocabularies(&self) -> &[CategoryVocabulary] {
        &self.categorical
    }

    /// Number of encoded columns.
    pub fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|vocabulary| vocabulary.levels.len())
                .sum::<usize>()
    }

    /// Encoded column names, e.g. `creditScore` or `education=Master`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .numeric
            .iter()
            .map(|scale| scale.field.name().to_string())
            .collect();
        for vocabulary in &self.categorical {
            names.extend(
                vocabulary
                    .levels
                    .iter()
                    .map(|level| format!("{}={}", vocabulary.field, level)),
            );
        }
        names
    }

    /// Validate then encode one record.
    pub fn encode(
        &self,
        record: &ApplicantRecord,
        strictness: EncodingStrictness,
    ) -> Result<EncodedFeatures, AssessmentError> {
        record.validate()?;

        let mut encoded = Vec::with_capacity(self.width());
        let numeric_values = record.numeric_values();
        for (scale, (_, value)) in self.numeric.iter().zip(numeric_values) {
            encoded.push(scale.standardize(value));
        }

        let categorical_values = record.categorical_values();
        for (vocabulary, (field, value)) in self.categorical.iter().zip(categorical_values) {
            let offset = encoded.len();
            encoded.resize(offset + vocabulary.levels.len(), 0.0);

            match vocabulary.slot(value) {
                CategorySlot::Reference => {}
                CategorySlot::Level(index) => encoded[offset + index] = 1.0,
                CategorySlot::Unseen => match strictness {
                    EncodingStrictness::Strict => {
                        return Err(AssessmentError::UnknownCategory {
                            field,
                            value: value.to_string(),
                        });
                    }
                    EncodingStrictness::Permissive => {
                        warn!(%field, value, "unseen category encoded as reference row");
                    }
                },
            }
        }

        Ok(EncodedFeatures(encoded))
    }
}
