//! Billing domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError, TemporalError};

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Due number outside `1..=duration`, computed or supplied
    #[error("Invalid due number {due_number}: plan has {duration} installments")]
    InvalidDueNumber {
        due_number: i64,
        duration: u32,
    },

    /// No installment amount can be resolved for the due number
    #[error("Plan schedule missing for plan {plan_id}, installment {due_number}")]
    PlanScheduleMissing {
        plan_id: String,
        due_number: u32,
    },

    /// Enrollment not found
    #[error("Enrollment not found: {0}")]
    EnrollmentNotFound(String),

    /// Plan not found
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Plan definition violates its invariants
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Member number already assigned to another enrollment
    #[error("Member number already in use: {0}")]
    DuplicateMemberNumber(String),

    /// The customer is already enrolled in the plan
    #[error("Customer {customer_id} is already enrolled in plan {plan_id}")]
    DuplicateEnrollment {
        customer_id: String,
        plan_id: String,
    },

    /// Caller-correctable request problem
    #[error("Validation error: {0}")]
    Validation(String),

    /// Amount arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Calendar arithmetic failed
    #[error("Calendar error: {0}")]
    Calendar(#[from] TemporalError),

    /// The persistence layer failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    /// Returns true for errors the caller can fix by changing the request
    ///
    /// These never leave state behind.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BillingError::InvalidDueNumber { .. }
                | BillingError::PlanScheduleMissing { .. }
                | BillingError::InvalidPlan(_)
                | BillingError::Validation(_)
                | BillingError::Money(_)
                | BillingError::Calendar(_)
        )
    }

    /// Returns true when a referenced record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BillingError::EnrollmentNotFound(_)
                | BillingError::PlanNotFound(_)
                | BillingError::InvoiceNotFound(_)
        )
    }

    /// Returns true when the write lost a race or hit a uniqueness rule
    pub fn is_conflict(&self) -> bool {
        match self {
            BillingError::DuplicateMemberNumber(_) | BillingError::DuplicateEnrollment { .. } => true,
            BillingError::Persistence(err) => err.is_conflict(),
            _ => false,
        }
    }
}
