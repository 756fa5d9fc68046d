use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scoring::{ApplicantRecord, Recommendation, RiskAssessment, RiskLevel};

/// Identifier wrapper for submitted loans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanId(pub String);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Officer-facing case status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Flagged => "flagged",
        }
    }

    /// Approved and rejected loans are closed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Rejected)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored loan case: applicant attributes, the assessment made at intake, and officer status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub loan_id: LoanId,
    pub applicant_name: Option<String>,
    pub applicant: ApplicantRecord,
    pub assessment: RiskAssessment,
    pub status: LoanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub officer_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    pub fn summary(&self) -> LoanSummary {
        LoanSummary {
            loan_id: self.loan_id.clone(),
            applicant_name: self.applicant_name.clone(),
            loan_amount: self.applicant.loan_amount,
            risk_score: self.assessment.verdict.risk_score,
            risk_level: self.assessment.verdict.risk_level,
            recommendation: self.assessment.verdict.recommendation,
            risk_rating: self.assessment.rating.rating,
            status: self.status,
            submitted_at: self.submitted_at,
        }
    }
}

/// Row shown on the officer's loan list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    pub loan_id: LoanId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    pub loan_amount: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommendation: Recommendation,
    pub risk_rating: u8,
    pub status: LoanStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Intake payload: an optional display name alongside the applicant fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanSubmission {
    pub applicant_name: Option<String>,
    pub fields: Map<String, Value>,
}

impl LoanSubmission {
    const NAME_KEYS: [&'static str; 2] = ["applicantName", "name"];

    /// Split the display name out of a flat intake body; everything else is applicant data.
    pub fn from_payload(mut payload: Map<String, Value>) -> Self {
        let mut applicant_name = None;
        for key in Self::NAME_KEYS {
            if let Some(Value::String(name)) = payload.remove(key) {
                let name = name.trim();
                if applicant_name.is_none() && !name.is_empty() {
                    applicant_name = Some(name.to_string());
                }
            }
        }

        Self {
            applicant_name,
            fields: payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: LoanStatus,
    #[serde(default, alias = "notes")]
    pub officer_notes: Option<String>,
}
