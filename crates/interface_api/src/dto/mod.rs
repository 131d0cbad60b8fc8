//! Request/Response data transfer objects

pub mod arrears;
pub mod enrollments;
pub mod invoices;
pub mod plans;
