use super::domain::{LoanApplication, LoanId, LoanStatus};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait LoanRepository: Send + Sync {
    fn insert(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    /// Replace the stored loan only while its status is still `expected`. The comparison and
    /// the write happen under one lock; a mismatch returns `StatusChanged` and stores nothing.
    fn update_if(
        &self,
        expected: LoanStatus,
        loan: LoanApplication,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError>;
    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError>;
    fn pending(&self, limit: usize) -> Result<Vec<LoanApplication>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored status changed to {current}")]
    StatusChanged { current: LoanStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
