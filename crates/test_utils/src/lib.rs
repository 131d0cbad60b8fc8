//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! chit fund billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built amounts, dates and plans
//! - `builders`: Builder patterns for plans, enrollments and invoices
//! - `assertions`: Custom assertion helpers for money and invoice chains
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
