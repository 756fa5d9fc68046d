use loan_risk::scoring::{ModelRegistry, TrainingParams};
use loan_risk::workflows::loans::{LoanApplication, LoanId, LoanRepository, LoanStatus, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) registry: Arc<ModelRegistry>,
    pub(crate) training: Arc<TrainingSource>,
}

/// Where retraining reads its history from.
#[derive(Debug, Clone)]
pub(crate) struct TrainingSource {
    pub(crate) path: PathBuf,
    pub(crate) params: TrainingParams,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRepository {
    records: Arc<Mutex<HashMap<LoanId, LoanApplication>>>,
}

impl InMemoryLoanRepository {
    fn records(&self) -> Result<MutexGuard<'_, HashMap<LoanId, LoanApplication>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl LoanRepository for InMemoryLoanRepository {
    fn insert(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records()?;
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
        let mut guard = self.records()?;
        let current = guard
            .get(&loan.loan_id)
            .map(|stored| stored.status)
            .ok_or(RepositoryError::NotFound)?;
        if current != expected {
            return Err(RepositoryError::StatusChanged { current });
        }
        guard.insert(loan.loan_id.clone(), loan);
        Ok(())
    }

    fn fetch(&self, id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
        Ok(self.records()?.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        Ok(self.records()?.values().cloned().collect())
    }

    fn pending(&self, limit: usize) -> Result<Vec<LoanApplication>, RepositoryError> {
        let guard = self.records()?;
        let mut pending: Vec<LoanApplication> = guard
            .values()
            .filter(|loan| loan.status == LoanStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        pending.truncate(limit);
        Ok(pending)
    }
}
