use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Map, Value};

use crate::scoring::training::fixtures::credit_driven_set;
use crate::scoring::{EncodingStrictness, ModelRegistry, RiskEngine, TrainingParams};
use crate::workflows::loans::domain::{LoanApplication, LoanId, LoanStatus, LoanSubmission};
use crate::workflows::loans::repository::{LoanRepository, RepositoryError};
use crate::workflows::loans::{loan_router, LoanApplicationService};

pub(super) fn engine() -> Arc<RiskEngine> {
    let mut params = TrainingParams::default();
    params.boosting.n_estimators = 30;
    let registry =
        ModelRegistry::bootstrap(&credit_driven_set(60), &params).expect("bootstrap trains");
    Arc::new(RiskEngine::new(
        Arc::new(registry),
        EncodingStrictness::Strict,
    ))
}

pub(super) fn applicant_fields(credit_score: u32) -> Map<String, Value> {
    let value = json!({
        "age": 35,
        "income": 60000,
        "loanAmount": 15000,
        "creditScore": credit_score,
        "monthsEmployed": 48,
        "numCreditLines": 2,
        "interestRate": 6.0,
        "loanTermMonths": 36,
        "debtToIncomeRatio": 0.3,
        "education": "Bachelor",
        "employmentStatus": "Employed",
        "maritalStatus": "Married",
        "hasMortgage": "No",
        "hasDependents": "No",
        "loanPurpose": "Business",
        "hasCoSigner": "No"
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!("literal is an object"),
    }
}

pub(super) fn submission(name: &str, credit_score: u32) -> LoanSubmission {
    LoanSubmission {
        applicant_name: Some(name.to_string()),
        fields: applicant_fields(credit_score),
    }
}

pub(super) fn build_service() -> (LoanApplicationService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = LoanApplicationService::new(repository.clone(), engine());
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<LoanId, LoanApplication>>>,
}

impl LoanRepository for MemoryRepository {
    fn insert(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&loan.loan_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(loan.loan_id.clone(), loan.clone());
        Ok(loan)
    }

    fn update_if(
        &self,
        expected: LoanStatus,
        loan: LoanApplication,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&loan.loan_id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored.status != expected => Err(RepositoryError::StatusChanged {
                current: stored.status,
            }),
            Some(_) => {
                guard.insert(loan.loan_id.clone(), loan);
                Ok(())
            }
        }
    }

    fn fetch(&self, id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn pending(&self, _limit: usize) -> Result<Vec<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|loan| loan.status == LoanStatus::Pending)
            .cloned()
            .collect())
    }
}

pub(super) struct ConflictRepository;

impl LoanRepository for ConflictRepository {
    fn insert(&self, _loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update_if(
        &self,
        _expected: LoanStatus,
        _loan: LoanApplication,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        Ok(None)
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        Ok(Vec::new())
    }

    fn pending(&self, _limit: usize) -> Result<Vec<LoanApplication>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Stores normally but every status write loses to a concurrent flag.
#[derive(Default)]
pub(super) struct ContendedRepository {
    pub(super) inner: MemoryRepository,
    pub(super) status_writes: AtomicUsize,
}

impl LoanRepository for ContendedRepository {
    fn insert(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        self.inner.insert(loan)
    }

    fn update_if(
        &self,
        _expected: LoanStatus,
        _loan: LoanApplication,
    ) -> Result<(), RepositoryError> {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::StatusChanged {
            current: LoanStatus::Flagged,
        })
    }

    fn fetch(&self, id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        self.inner.list()
    }

    fn pending(&self, limit: usize) -> Result<Vec<LoanApplication>, RepositoryError> {
        self.inner.pending(limit)
    }
}

pub(super) struct UnavailableRepository;

impl LoanRepository for UnavailableRepository {
    fn insert(&self, _loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_if(
        &self,
        _expected: LoanStatus,
        _loan: LoanApplication,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<LoanApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn loan_router_with_service(
    service: LoanApplicationService<MemoryRepository>,
) -> axum::Router {
    loan_router(Arc::new(service))
}
