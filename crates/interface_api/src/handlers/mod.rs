//! Request handlers

pub mod arrears;
pub mod enrollments;
pub mod health;
pub mod invoices;
pub mod plans;
