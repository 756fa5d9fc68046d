//! Business workflows built on the scoring engine.

pub mod loans;
