use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scoring::applicant::ApplicantRecord;

const MAX_RISK: f64 = 100.0;

/// The five inputs blended into the final risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskComponentKind {
    Model,
    CreditScore,
    DebtToIncome,
    EmploymentTenure,
    LoanToIncome,
}

impl RiskComponentKind {
    pub const ALL: [RiskComponentKind; 5] = [
        RiskComponentKind::Model,
        RiskComponentKind::CreditScore,
        RiskComponentKind::DebtToIncome,
        RiskComponentKind::EmploymentTenure,
        RiskComponentKind::LoanToIncome,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RiskComponentKind::Model => "model",
            RiskComponentKind::CreditScore => "credit_score",
            RiskComponentKind::DebtToIncome => "debt_to_income",
            RiskComponentKind::EmploymentTenure => "employment_tenure",
            RiskComponentKind::LoanToIncome => "loan_to_income",
        }
    }
}

impl fmt::Display for RiskComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A rule-based risk component scored on [0, 100] from the raw applicant record.
pub trait ComponentRule: Send + Sync {
    fn kind(&self) -> RiskComponentKind;
    fn score(&self, record: &ApplicantRecord) -> f64;
}

/// Model-based component: the calibrated probability expressed on the 0-100 scale.
pub fn model_risk(probability: f64) -> f64 {
    (probability * MAX_RISK).clamp(0.0, MAX_RISK)
}

/// Step function on credit score: full risk below `high_risk_below`, half risk below
/// `elevated_risk_below`, none otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditScoreRule {
    pub high_risk_below: f64,
    pub elevated_risk_below: f64,
}

impl Default for CreditScoreRule {
    fn default() -> Self {
        Self {
            high_risk_below: 550.0,
            elevated_risk_below: 650.0,
        }
    }
}

impl ComponentRule for CreditScoreRule {
    fn kind(&self) -> RiskComponentKind {
        RiskComponentKind::CreditScore
    }

    fn score(&self, record: &ApplicantRecord) -> f64 {
        if record.credit_score < self.high_risk_below {
            MAX_RISK
        } else if record.credit_score < self.elevated_risk_below {
            MAX_RISK / 2.0
        } else {
            0.0
        }
    }
}

/// Step function on debt-to-income; thresholds are exclusive so a ratio equal to a threshold
/// falls into the lower band.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtToIncomeRule {
    pub high_risk_above: f64,
    pub elevated_risk_above: f64,
}

impl Default for DebtToIncomeRule {
    fn default() -> Self {
        Self {
            high_risk_above: 0.65,
            elevated_risk_above: 0.43,
        }
    }
}

impl ComponentRule for DebtToIncomeRule {
    fn kind(&self) -> RiskComponentKind {
        RiskComponentKind::DebtToIncome
    }

    fn score(&self, record: &ApplicantRecord) -> f64 {
        if record.debt_to_income_ratio > self.high_risk_above {
            MAX_RISK
        } else if record.debt_to_income_ratio > self.elevated_risk_above {
            MAX_RISK / 2.0
        } else {
            0.0
        }
    }
}

/// Linear decay from full risk at zero months to none at `full_tenure_months`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmploymentTenureRule {
    pub full_tenure_months: f64,
}

impl Default for EmploymentTenureRule {
    fn default() -> Self {
        Self {
            full_tenure_months: 120.0,
        }
    }
}

impl ComponentRule for EmploymentTenureRule {
    fn kind(&self) -> RiskComponentKind {
        RiskComponentKind::EmploymentTenure
    }

    fn score(&self, record: &ApplicantRecord) -> f64 {
        let shortfall = (self.full_tenure_months - record.months_employed) / self.full_tenure_months;
        (shortfall * MAX_RISK).clamp(0.0, MAX_RISK)
    }
}

/// Loan amount as a percentage of income, capped at 100. Zero income scores maximal risk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanToIncomeRule;

impl ComponentRule for LoanToIncomeRule {
    fn kind(&self) -> RiskComponentKind {
        RiskComponentKind::LoanToIncome
    }

    fn score(&self, record: &ApplicantRecord) -> f64 {
        match record.loan_to_income_ratio() {
            Ok(ratio) => (ratio * MAX_RISK).clamp(0.0, MAX_RISK),
            Err(err) => {
                warn!(error = %err, "loan-to-income undefined, scoring maximal risk");
                MAX_RISK
            }
        }
    }
}
