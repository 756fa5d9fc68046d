mod policy;
mod rules;

pub use policy::{PolicyError, Recommendation, RiskLevel, RiskWeights, UnderwritingBands};
pub use rules::{
    model_risk, ComponentRule, CreditScoreRule, DebtToIncomeRule, EmploymentTenureRule,
    LoanToIncomeRule, RiskComponentKind,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::applicant::ApplicantRecord;

/// Every sub-score that fed the final risk score, each on [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdown {
    pub model_risk: f64,
    pub credit_score_risk: f64,
    pub debt_to_income_risk: f64,
    pub employment_tenure_risk: f64,
    pub loan_to_income_risk: f64,
}

impl RiskBreakdown {
    pub fn component(&self, kind: RiskComponentKind) -> f64 {
        match kind {
            RiskComponentKind::Model => self.model_risk,
            RiskComponentKind::CreditScore => self.credit_score_risk,
            RiskComponentKind::DebtToIncome => self.debt_to_income_risk,
            RiskComponentKind::EmploymentTenure => self.employment_tenure_risk,
            RiskComponentKind::LoanToIncome => self.loan_to_income_risk,
        }
    }
}

/// Final output of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskVerdict {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub default_probability: f64,
    pub recommendation: Recommendation,
    pub components: RiskBreakdown,
}

/// Blends the model probability with the rule-based components. Stateless.
#[derive(Debug, Clone, Default)]
pub struct RiskComposer {
    weights: RiskWeights,
    bands: UnderwritingBands,
    credit_score: CreditScoreRule,
    debt_to_income: DebtToIncomeRule,
    employment_tenure: EmploymentTenureRule,
    loan_to_income: LoanToIncomeRule,
}

impl RiskComposer {
    pub fn new(weights: RiskWeights, bands: UnderwritingBands) -> Self {
        Self {
            weights,
            bands,
            ..Self::default()
        }
    }

    pub fn with_credit_score_rule(mut self, rule: CreditScoreRule) -> Self {
        self.credit_score = rule;
        self
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    pub fn bands(&self) -> &UnderwritingBands {
        &self.bands
    }

    /// A non-finite probability is scored as certain default.
    pub fn compose(&self, record: &ApplicantRecord, probability: f64) -> RiskVerdict {
        let default_probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            warn!(probability, "non-finite default probability, scoring maximal model risk");
            1.0
        };
        let components = RiskBreakdown {
            model_risk: model_risk(default_probability),
            credit_score_risk: self.credit_score.score(record),
            debt_to_income_risk: self.debt_to_income.score(record),
            employment_tenure_risk: self.employment_tenure.score(record),
            loan_to_income_risk: self.loan_to_income.score(record),
        };

        let weighted: f64 = self
            .weights
            .entries()
            .iter()
            .map(|(kind, weight)| weight * components.component(*kind))
            .sum();
        let risk_score = weighted.clamp(0.0, 100.0);
        let (risk_level, recommendation) = self.bands.classify(risk_score);

        RiskVerdict {
            risk_score,
            risk_level,
            default_probability,
            recommendation,
            components,
        }
    }
}
