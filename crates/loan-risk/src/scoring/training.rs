use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::applicant::ApplicantRecord;
use super::encoder::{EncodingStrictness, FeatureEncoder};
use super::error::TrainingError;
use super::model::{BoostingParams, GradientBoostedClassifier};
use super::snapshot::ModelSnapshot;

const TOP_FEATURES: usize = 10;
const LOG_LOSS_EPSILON: f64 = 1e-15;

/// One historical loan and whether it defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledApplicant {
    pub applicant: ApplicantRecord,
    pub defaulted: bool,
}

/// Historical loans used to fit a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    rows: Vec<LabeledApplicant>,
}

impl TrainingSet {
    pub fn new(rows: Vec<LabeledApplicant>) -> Self {
        Self { rows }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Read the historical export layout (`Age,Income,...,HasCoSigner,Default`).
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TrainingError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();

        for (index, record) in csv_reader.deserialize::<HistoryRow>().enumerate() {
            let row = record?;
            let defaulted = parse_label(&row.default).ok_or_else(|| TrainingError::InvalidLabel {
                row: index + 1,
                value: row.default.clone(),
            })?;
            rows.push(LabeledApplicant {
                applicant: row.into_applicant(),
                defaulted,
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[LabeledApplicant] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Deterministic split: every `stride`-th row is held out. Rows keep their 0-based dataset
    /// index so failures can name the original row.
    fn split(&self, stride: Option<usize>) -> (Vec<IndexedRow<'_>>, Vec<IndexedRow<'_>>) {
        let indexed = self.rows.iter().enumerate();
        match stride {
            None => (indexed.collect(), Vec::new()),
            Some(stride) => {
                let (holdout, training): (Vec<_>, Vec<_>) =
                    indexed.partition(|(index, _)| index % stride == stride - 1);
                (training, holdout)
            }
        }
    }
}

type IndexedRow<'a> = (usize, &'a LabeledApplicant);

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub boosting: BoostingParams,
    /// Share of rows held out for evaluation; 0 disables the holdout.
    pub holdout_fraction: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            boosting: BoostingParams::default(),
            holdout_fraction: 0.2,
        }
    }
}

impl TrainingParams {
    fn holdout_stride(&self) -> Option<usize> {
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return None;
        }
        Some(((1.0 / self.holdout_fraction).round() as usize).max(2))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Diagnostics from one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub training_rows: usize,
    pub holdout_rows: usize,
    pub default_rate: f64,
    pub training_accuracy: f64,
    pub holdout_accuracy: Option<f64>,
    pub holdout_log_loss: Option<f64>,
    pub top_features: Vec<FeatureImportance>,
}

/// Fit the encoder and classifier on `dataset` and bundle them into an unpublished snapshot.
pub fn train(dataset: &TrainingSet, params: &TrainingParams) -> Result<ModelSnapshot, TrainingError> {
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    for (index, row) in dataset.rows().iter().enumerate() {
        row.applicant
            .validate()
            .map_err(|source| TrainingError::InvalidRecord {
                row: index + 1,
                source,
            })?;
    }

    let (training, holdout) = dataset.split(params.holdout_stride());
    let applicants: Vec<&ApplicantRecord> =
        training.iter().map(|(_, row)| &row.applicant).collect();
    let labels: Vec<bool> = training.iter().map(|(_, row)| row.defaulted).collect();

    let encoder = FeatureEncoder::fit(&applicants)?;
    let features = training
        .iter()
        .map(|(index, row)| {
            encoder
                .encode(&row.applicant, EncodingStrictness::Strict)
                .map_err(|source| TrainingError::InvalidRecord {
                    row: index + 1,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let classifier = GradientBoostedClassifier::fit(&features, &labels, &params.boosting)?;

    let training_probabilities: Vec<f64> = features
        .iter()
        .map(|row| classifier.predict_probability(row))
        .collect();

    // The holdout may carry categories the training partition never saw.
    let mut holdout_probabilities = Vec::with_capacity(holdout.len());
    for (index, row) in &holdout {
        let encoded = encoder
            .encode(&row.applicant, EncodingStrictness::Permissive)
            .map_err(|source| TrainingError::InvalidRecord {
                row: index + 1,
                source,
            })?;
        holdout_probabilities.push(classifier.predict_probability(&encoded));
    }
    let holdout_labels: Vec<bool> = holdout.iter().map(|(_, row)| row.defaulted).collect();

    let report = TrainingReport {
        training_rows: training.len(),
        holdout_rows: holdout.len(),
        default_rate: labels.iter().filter(|&&label| label).count() as f64 / labels.len() as f64,
        training_accuracy: accuracy(&training_probabilities, &labels),
        holdout_accuracy: (!holdout.is_empty())
            .then(|| accuracy(&holdout_probabilities, &holdout_labels)),
        holdout_log_loss: (!holdout.is_empty())
            .then(|| log_loss(&holdout_probabilities, &holdout_labels)),
        top_features: top_features(&encoder.feature_names(), &classifier.feature_importances()),
    };

    info!(
        training_rows = report.training_rows,
        holdout_rows = report.holdout_rows,
        training_accuracy = report.training_accuracy,
        holdout_accuracy = ?report.holdout_accuracy,
        "default model trained"
    );

    ModelSnapshot::new(encoder, classifier, report)
}

fn accuracy(probabilities: &[f64], labels: &[bool]) -> f64 {
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(probability, &label)| (**probability >= 0.5) == label)
        .count();
    correct as f64 / labels.len() as f64
}

fn log_loss(probabilities: &[f64], labels: &[bool]) -> f64 {
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(probability, &label)| {
            let p = probability.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
            if label {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len() as f64
}

fn top_features(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .filter(|(_, importance)| **importance > 0.0)
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    ranked.truncate(TOP_FEATURES);
    ranked
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" => Some(true),
        "0" | "no" | "false" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "Age")]
    age: f64,
    #[serde(rename = "Income")]
    income: f64,
    #[serde(rename = "LoanAmount")]
    loan_amount: f64,
    #[serde(rename = "CreditScore")]
    credit_score: f64,
    #[serde(rename = "MonthsEmployed")]
    months_employed: f64,
    #[serde(rename = "NumCreditLines")]
    num_credit_lines: f64,
    #[serde(rename = "InterestRate")]
    interest_rate: f64,
    #[serde(rename = "LoanTerm", alias = "LoanTermMonths")]
    loan_term: f64,
    #[serde(rename = "DTIRatio", alias = "DTIratio")]
    dti_ratio: f64,
    #[serde(rename = "Education")]
    education: String,
    #[serde(rename = "EmploymentType", alias = "EmploymentStatus")]
    employment: String,
    #[serde(rename = "MaritalStatus")]
    marital_status: String,
    #[serde(rename = "HasMortgage")]
    has_mortgage: String,
    #[serde(rename = "HasDependents")]
    has_dependents: String,
    #[serde(rename = "LoanPurpose")]
    loan_purpose: String,
    #[serde(rename = "HasCoSigner")]
    has_co_signer: String,
    #[serde(rename = "Default")]
    default: String,
}

impl HistoryRow {
    fn into_applicant(self) -> ApplicantRecord {
        ApplicantRecord {
            age: self.age,
            income: self.income,
            loan_amount: self.loan_amount,
            credit_score: self.credit_score,
            months_employed: self.months_employed,
            num_credit_lines: self.num_credit_lines,
            interest_rate: self.interest_rate,
            loan_term_months: self.loan_term,
            debt_to_income_ratio: self.dti_ratio,
            education: self.education,
            employment_status: self.employment,
            marital_status: self.marital_status,
            has_mortgage: self.has_mortgage,
            has_dependents: self.has_dependents,
            loan_purpose: self.loan_purpose,
            has_co_signer: self.has_co_signer,
        }
    }
}
