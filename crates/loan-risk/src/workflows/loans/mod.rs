//! Loan case intake and officer review.
//!
//! Each submission is scored by the [`RiskEngine`](crate::scoring::RiskEngine) at intake and
//! stored as a pending case. Officers move cases to approved, rejected or flagged; approved and
//! rejected cases are closed.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{LoanApplication, LoanId, LoanStatus, LoanSubmission, LoanSummary, StatusUpdate};
pub use repository::{LoanRepository, RepositoryError};
pub use router::loan_router;
pub use service::{LoanApplicationService, LoanServiceError};
