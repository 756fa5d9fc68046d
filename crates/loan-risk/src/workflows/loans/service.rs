use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::domain::{LoanApplication, LoanId, LoanStatus, LoanSubmission, StatusUpdate};
use super::repository::{LoanRepository, RepositoryError};
use crate::scoring::{ApplicantRecord, AssessmentError, RiskAssessment, RiskEngine};

const STATUS_WRITE_ATTEMPTS: u32 = 3;

/// Service composing the risk engine with loan case storage.
pub struct LoanApplicationService<R> {
    repository: Arc<R>,
    engine: Arc<RiskEngine>,
    sequence: AtomicU64,
}

impl<R> LoanApplicationService<R>
where
    R: LoanRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<RiskEngine>) -> Self {
        Self {
            repository,
            engine,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &Arc<RiskEngine> {
        &self.engine
    }

    fn next_loan_id(&self) -> LoanId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        LoanId(format!("LOAN-{id:06}"))
    }

    /// Score an applicant without opening a case.
    pub fn assess(&self, fields: &Map<String, Value>) -> Result<RiskAssessment, LoanServiceError> {
        Ok(self.engine.assess(fields)?)
    }

    /// Assess the applicant and store a new pending loan.
    pub fn submit(&self, submission: LoanSubmission) -> Result<LoanApplication, LoanServiceError> {
        let applicant = ApplicantRecord::from_fields(&submission.fields)?;
        let assessment = self.engine.assess_record(&applicant)?;
        let now = Utc::now();

        let loan = LoanApplication {
            loan_id: self.next_loan_id(),
            applicant_name: submission.applicant_name,
            applicant,
            assessment,
            status: LoanStatus::Pending,
            officer_notes: None,
            submitted_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(loan)?;
        info!(
            loan_id = %stored.loan_id,
            risk_score = stored.assessment.verdict.risk_score,
            "loan submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, loan_id: &LoanId) -> Result<LoanApplication, LoanServiceError> {
        let loan = self
            .repository
            .fetch(loan_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(loan)
    }

    /// Every loan, newest first.
    pub fn list(&self) -> Result<Vec<LoanApplication>, LoanServiceError> {
        let mut loans = self.repository.list()?;
        newest_first(&mut loans);
        Ok(loans)
    }

    pub fn pending(&self, limit: usize) -> Result<Vec<LoanApplication>, LoanServiceError> {
        let mut loans = self.repository.pending(limit)?;
        newest_first(&mut loans);
        loans.truncate(limit);
        Ok(loans)
    }

    /// Record an officer decision. Closed loans cannot change again; the write only lands if
    /// the status read here is still the stored one.
    pub fn update_status(
        &self,
        loan_id: &LoanId,
        update: StatusUpdate,
    ) -> Result<LoanApplication, LoanServiceError> {
        let mut attempt = 1;
        loop {
            let mut loan = self.get(loan_id)?;
            let previous = loan.status;
            if previous.is_terminal() {
                return Err(LoanServiceError::InvalidTransition {
                    from: previous,
                    to: update.status,
                });
            }

            loan.status = update.status;
            if update.officer_notes.is_some() {
                loan.officer_notes = update.officer_notes.clone();
            }
            loan.updated_at = Utc::now();

            match self.repository.update_if(previous, loan.clone()) {
                Ok(()) => {
                    info!(%loan_id, from = %previous, to = %loan.status, "loan status updated");
                    return Ok(loan);
                }
                Err(RepositoryError::StatusChanged { current })
                    if attempt < STATUS_WRITE_ATTEMPTS =>
                {
                    debug!(
                        %loan_id,
                        %current,
                        attempt,
                        "loan status moved underneath update, retrying"
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

fn newest_first(loans: &mut [LoanApplication]) {
    loans.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| b.loan_id.cmp(&a.loan_id))
    });
}

/// Error raised by the loan service.
#[derive(Debug, thiserror::Error)]
pub enum LoanServiceError {
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("loan is {from} and cannot move to {to}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },
}
