use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AssessmentError;

const CREDIT_SCORE_RANGE: RangeInclusive<f64> = 300.0..=850.0;
const DEBT_TO_INCOME_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Numeric fields that may never be negative.
const NON_NEGATIVE: [ApplicantField; 6] = [
    ApplicantField::Income,
    ApplicantField::LoanAmount,
    ApplicantField::MonthsEmployed,
    ApplicantField::NumCreditLines,
    ApplicantField::InterestRate,
    ApplicantField::LoanTermMonths,
];

/// Every attribute an applicant must declare, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicantField {
    Age,
    Income,
    LoanAmount,
    CreditScore,
    MonthsEmployed,
    NumCreditLines,
    InterestRate,
    LoanTermMonths,
    DebtToIncomeRatio,
    Education,
    EmploymentStatus,
    MaritalStatus,
    HasMortgage,
    HasDependents,
    LoanPurpose,
    HasCoSigner,
}

impl ApplicantField {
    /// Numeric fields in encoded column order.
    pub const NUMERIC: [ApplicantField; 9] = [
        ApplicantField::Age,
        ApplicantField::Income,
        ApplicantField::LoanAmount,
        ApplicantField::CreditScore,
        ApplicantField::MonthsEmployed,
        ApplicantField::NumCreditLines,
        ApplicantField::InterestRate,
        ApplicantField::LoanTermMonths,
        ApplicantField::DebtToIncomeRatio,
    ];

    /// Categorical fields in encoded block order.
    pub const CATEGORICAL: [ApplicantField; 7] = [
        ApplicantField::Education,
        ApplicantField::EmploymentStatus,
        ApplicantField::MaritalStatus,
        ApplicantField::HasMortgage,
        ApplicantField::HasDependents,
        ApplicantField::LoanPurpose,
        ApplicantField::HasCoSigner,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ApplicantField::Age => "age",
            ApplicantField::Income => "income",
            ApplicantField::LoanAmount => "loanAmount",
            ApplicantField::CreditScore => "creditScore",
            ApplicantField::MonthsEmployed => "monthsEmployed",
            ApplicantField::NumCreditLines => "numCreditLines",
            ApplicantField::InterestRate => "interestRate",
            ApplicantField::LoanTermMonths => "loanTermMonths",
            ApplicantField::DebtToIncomeRatio => "debtToIncomeRatio",
            ApplicantField::Education => "education",
            ApplicantField::EmploymentStatus => "employmentStatus",
            ApplicantField::MaritalStatus => "maritalStatus",
            ApplicantField::HasMortgage => "hasMortgage",
            ApplicantField::HasDependents => "hasDependents",
            ApplicantField::LoanPurpose => "loanPurpose",
            ApplicantField::HasCoSigner => "hasCoSigner",
        }
    }

    /// Older client payloads used these keys.
    const fn aliases(self) -> &'static [&'static str] {
        match self {
            ApplicantField::LoanTermMonths => &["loanTerm"],
            ApplicantField::DebtToIncomeRatio => &["dtiRatio"],
            ApplicantField::EmploymentStatus => &["employmentType"],
            _ => &[],
        }
    }

    fn lookup(self, fields: &Map<String, Value>) -> Option<&Value> {
        std::iter::once(self.name())
            .chain(self.aliases().iter().copied())
            .find_map(|key| fields.get(key).filter(|value| !value.is_null()))
    }
}

impl fmt::Display for ApplicantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw applicant attributes as submitted for assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRecord {
    pub age: f64,
    pub income: f64,
    pub loan_amount: f64,
    pub credit_score: f64,
    pub months_employed: f64,
    pub num_credit_lines: f64,
    pub interest_rate: f64,
    pub loan_term_months: f64,
    pub debt_to_income_ratio: f64,
    pub education: String,
    pub employment_status: String,
    pub marital_status: String,
    pub has_mortgage: String,
    pub has_dependents: String,
    pub loan_purpose: String,
    pub has_co_signer: String,
}

impl ApplicantRecord {
    /// Build a record from a field-name mapping. Every declared field is required; nothing is
    /// defaulted.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, AssessmentError> {
        Ok(Self {
            age: read_number(fields, ApplicantField::Age)?,
            income: read_number(fields, ApplicantField::Income)?,
            loan_amount: read_number(fields, ApplicantField::LoanAmount)?,
            credit_score: read_number(fields, ApplicantField::CreditScore)?,
            months_employed: read_number(fields, ApplicantField::MonthsEmployed)?,
            num_credit_lines: read_number(fields, ApplicantField::NumCreditLines)?,
            interest_rate: read_number(fields, ApplicantField::InterestRate)?,
            loan_term_months: read_number(fields, ApplicantField::LoanTermMonths)?,
            debt_to_income_ratio: read_number(fields, ApplicantField::DebtToIncomeRatio)?,
            education: read_category(fields, ApplicantField::Education)?,
            employment_status: read_category(fields, ApplicantField::EmploymentStatus)?,
            marital_status: read_category(fields, ApplicantField::MaritalStatus)?,
            has_mortgage: read_category(fields, ApplicantField::HasMortgage)?,
            has_dependents: read_category(fields, ApplicantField::HasDependents)?,
            loan_purpose: read_category(fields, ApplicantField::LoanPurpose)?,
            has_co_signer: read_category(fields, ApplicantField::HasCoSigner)?,
        })
    }

    /// Numeric values paired with their field, in [`ApplicantField::NUMERIC`] order.
    pub fn numeric_values(&self) -> [(ApplicantField, f64); 9] {
        [
            (ApplicantField::Age, self.age),
            (ApplicantField::Income, self.income),
            (ApplicantField::LoanAmount, self.loan_amount),
            (ApplicantField::CreditScore, self.credit_score),
            (ApplicantField::MonthsEmployed, self.months_employed),
            (ApplicantField::NumCreditLines, self.num_credit_lines),
            (ApplicantField::InterestRate, self.interest_rate),
            (ApplicantField::LoanTermMonths, self.loan_term_months),
            (ApplicantField::DebtToIncomeRatio, self.debt_to_income_ratio),
        ]
    }

    /// Categorical values paired with their field, in [`ApplicantField::CATEGORICAL`] order.
    pub fn categorical_values(&self) -> [(ApplicantField, &str); 7] {
        [
            (ApplicantField::Education, self.education.as_str()),
            (ApplicantField::EmploymentStatus, self.employment_status.as_str()),
            (ApplicantField::MaritalStatus, self.marital_status.as_str()),
            (ApplicantField::HasMortgage, self.has_mortgage.as_str()),
            (ApplicantField::HasDependents, self.has_dependents.as_str()),
            (ApplicantField::LoanPurpose, self.loan_purpose.as_str()),
            (ApplicantField::HasCoSigner, self.has_co_signer.as_str()),
        ]
    }

    /// Range checks run before any encoding or scoring.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        let values = self.numeric_values();

        for (field, value) in values {
            if !value.is_finite() {
                return Err(AssessmentError::OutOfRange { field, value });
            }
        }

        if !CREDIT_SCORE_RANGE.contains(&self.credit_score) {
            return Err(AssessmentError::OutOfRange {
                field: ApplicantField::CreditScore,
                value: self.credit_score,
            });
        }

        if !DEBT_TO_INCOME_RANGE.contains(&self.debt_to_income_ratio) {
            return Err(AssessmentError::OutOfRange {
                field: ApplicantField::DebtToIncomeRatio,
                value: self.debt_to_income_ratio,
            });
        }

        for (field, value) in values {
            if NON_NEGATIVE.contains(&field) && value < 0.0 {
                return Err(AssessmentError::OutOfRange { field, value });
            }
        }

        Ok(())
    }

    /// Requested loan amount relative to declared income.
    pub fn loan_to_income_ratio(&self) -> Result<f64, AssessmentError> {
        if self.income <= 0.0 {
            return Err(AssessmentError::DivideByZeroRisk(ApplicantField::Income));
        }
        Ok(self.loan_amount / self.income)
    }
}

fn read_number(fields: &Map<String, Value>, field: ApplicantField) -> Result<f64, AssessmentError> {
    let invalid = AssessmentError::InvalidType {
        field,
        expected: "number",
    };

    match field.lookup(fields) {
        None => Err(AssessmentError::MissingField(field)),
        Some(Value::Number(number)) => number.as_f64().ok_or(invalid),
        Some(Value::String(raw)) if raw.trim().is_empty() => {
            Err(AssessmentError::MissingField(field))
        }
        Some(Value::String(raw)) => raw.trim().parse::<f64>().map_err(|_| invalid),
        Some(_) => Err(invalid),
    }
}

fn read_category(
    fields: &Map<String, Value>,
    field: ApplicantField,
) -> Result<String, AssessmentError> {
    match field.lookup(fields) {
        None => Err(AssessmentError::MissingField(field)),
        Some(Value::String(raw)) if raw.trim().is_empty() => {
            Err(AssessmentError::MissingField(field))
        }
        Some(Value::String(raw)) => Ok(raw.trim().to_string()),
        Some(_) => Err(AssessmentError::InvalidType {
            field,
            expected: "string",
        }),
    }
}
