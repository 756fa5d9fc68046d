//! Loan default risk scoring.
//!
//! The [`scoring`] module holds the engine: applicant validation, feature encoding, the boosted
//! default-probability model, and the weighted risk composer. [`workflows::loans`] layers the
//! case-management flow (pending/approved/rejected loans) and its HTTP router on top.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
pub mod workflows;
