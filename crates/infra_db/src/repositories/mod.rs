//! Repository implementations
//!
//! Repositories own the SQL. They work on row types and return
//! `DatabaseError`; adapters map both to the domain.

pub mod billing;

pub use billing::{BillingRepository, EnrollmentRow, InvoiceRow, PlanRow};
