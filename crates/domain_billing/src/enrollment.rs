//! Enrollments: a customer's subscription to one plan

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, EnrollmentId, Money, PlanId};

use crate::plan::Plan;

/// Enrollment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Installments are being billed
    Active,
    /// All installments billed and settled
    Completed,
    /// Withdrawn before completion
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(EnrollmentStatus::Active),
            "completed" => Some(EnrollmentStatus::Completed),
            "cancelled" => Some(EnrollmentStatus::Cancelled),
            _ => None,
        }
    }
}

/// A customer's subscription to a plan
///
/// The invoice history is stored separately and owned by the enrollment.
/// `current_arrear` is maintained by the periodic refresh (or seeded by an
/// administrator) and is never read when an invoice is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub customer_id: CustomerId,
    pub plan_id: PlanId,
    /// Globally unique member number
    pub member_number: String,
    /// Start of the first installment month
    pub start_date: NaiveDate,
    pub status: EnrollmentStatus,
    /// Sum of payments received across invoices
    pub total_paid: Money,
    /// Sum of installment amounts billed across invoices
    pub total_due: Money,
    pub current_arrear: Money,
    pub arrear_last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    /// Creates an active enrollment with zeroed running totals
    pub fn new(
        customer_id: CustomerId,
        plan: &Plan,
        member_number: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        let zero = Money::zero(plan.currency());
        Self {
            id: EnrollmentId::new_v7(),
            customer_id,
            plan_id: plan.id,
            member_number: member_number.into(),
            start_date,
            status: EnrollmentStatus::Active,
            total_paid: zero,
            total_due: zero,
            current_arrear: zero,
            arrear_last_updated: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanType, ScheduleSource};
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_enrollment_is_active_with_zero_totals() {
        let plan = Plan::new(
            "Gold",
            Money::new(dec!(12000), Currency::INR),
            12,
            PlanType::Monthly,
            ScheduleSource::FlatMonthly { amount: Money::new(dec!(1000), Currency::INR) },
        )
        .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let enrollment = Enrollment::new(CustomerId::new(), &plan, "M-001", start);

        assert!(enrollment.is_active());
        assert_eq!(enrollment.plan_id, plan.id);
        assert!(enrollment.total_paid.is_zero());
        assert!(enrollment.current_arrear.is_zero());
        assert!(enrollment.arrear_last_updated.is_none());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [EnrollmentStatus::Active, EnrollmentStatus::Completed, EnrollmentStatus::Cancelled] {
            assert_eq!(EnrollmentStatus::parse(status.as_str()), Some(status));
        }
    }
}
