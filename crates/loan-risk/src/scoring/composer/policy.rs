use serde::{Deserialize, Serialize};

use super::rules::RiskComponentKind;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Rejected policy tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("risk weights must sum to 1.00 (found {total:.4})")]
    WeightsDoNotSumToOne { total: f64 },
    #[error("weight for {component} must lie in [0, 1] (found {weight})")]
    WeightOutOfRange {
        component: RiskComponentKind,
        weight: f64,
    },
    #[error("band thresholds must satisfy 0 <= review ({review_from}) < reject ({reject_from}) <= 100")]
    BandsOutOfOrder { review_from: f64, reject_from: f64 },
}

/// Blend weights for the five risk components. Always sums to 1.00.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskWeights {
    model: f64,
    credit_score: f64,
    debt_to_income: f64,
    employment_tenure: f64,
    loan_to_income: f64,
}

impl RiskWeights {
    /// Underwriting weights approved for production scoring.
    pub const STANDARD: RiskWeights = RiskWeights {
        model: 0.20,
        credit_score: 0.30,
        debt_to_income: 0.20,
        employment_tenure: 0.15,
        loan_to_income: 0.15,
    };

    pub fn new(
        model: f64,
        credit_score: f64,
        debt_to_income: f64,
        employment_tenure: f64,
        loan_to_income: f64,
    ) -> Result<Self, PolicyError> {
        let weights = Self {
            model,
            credit_score,
            debt_to_income,
            employment_tenure,
            loan_to_income,
        };

        for (component, weight) in weights.entries() {
            if !(0.0..=1.0).contains(&weight) {
                return Err(PolicyError::WeightOutOfRange { component, weight });
            }
        }

        let total = weights.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PolicyError::WeightsDoNotSumToOne { total });
        }

        Ok(weights)
    }

    /// The weight table, in blend order.
    pub fn entries(&self) -> [(RiskComponentKind, f64); 5] {
        [
            (RiskComponentKind::Model, self.model),
            (RiskComponentKind::CreditScore, self.credit_score),
            (RiskComponentKind::DebtToIncome, self.debt_to_income),
            (RiskComponentKind::EmploymentTenure, self.employment_tenure),
            (RiskComponentKind::LoanToIncome, self.loan_to_income),
        ]
    }

    pub fn weight(&self, component: RiskComponentKind) -> f64 {
        match component {
            RiskComponentKind::Model => self.model,
            RiskComponentKind::CreditScore => self.credit_score,
            RiskComponentKind::DebtToIncome => self.debt_to_income,
            RiskComponentKind::EmploymentTenure => self.employment_tenure,
            RiskComponentKind::LoanToIncome => self.loan_to_income,
        }
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, weight)| weight).sum()
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Underwriting risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Underwriting action paired with a risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

/// Three-way underwriting bands on the final score, low-inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderwritingBands {
    review_from: f64,
    reject_from: f64,
}

impl UnderwritingBands {
    pub const STANDARD: UnderwritingBands = UnderwritingBands {
        review_from: 30.0,
        reject_from: 60.0,
    };

    pub fn new(review_from: f64, reject_from: f64) -> Result<Self, PolicyError> {
        if !(0.0 <= review_from && review_from < reject_from && reject_from <= 100.0) {
            return Err(PolicyError::BandsOutOfOrder {
                review_from,
                reject_from,
            });
        }
        Ok(Self {
            review_from,
            reject_from,
        })
    }

    pub fn classify(&self, score: f64) -> (RiskLevel, Recommendation) {
        if score < self.review_from {
            (RiskLevel::Low, Recommendation::Approve)
        } else if score < self.reject_from {
            (RiskLevel::Medium, Recommendation::Review)
        } else {
            (RiskLevel::High, Recommendation::Reject)
        }
    }
}

impl Default for UnderwritingBands {
    fn default() -> Self {
        Self::STANDARD
    }
}
