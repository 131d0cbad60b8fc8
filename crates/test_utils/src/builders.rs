//! Test Data Builders
//!
//! Builder patterns for constructing billing test data with sensible
//! defaults. Tests set only the fields they care about.

use chrono::NaiveDate;
use core_kernel::{BillingCalendar, BillingPhase, Currency, CustomerId, EnrollmentId, Money, PlanId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_billing::{
    DueNumberSource, Enrollment, Invoice, InvoiceDraft, Plan, PlanType, ScheduleEntry,
    ScheduleSource,
};

use crate::fixtures::DateFixtures;

/// Builder for plans
pub struct TestPlanBuilder {
    name: String,
    duration: u32,
    installment: Decimal,
    schedule: Option<Vec<Option<Decimal>>>,
}

impl Default for TestPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPlanBuilder {
    /// Creates a new builder: 20 installments of 1000 INR
    pub fn new() -> Self {
        Self {
            name: "Test Chit".to_string(),
            duration: 20,
            installment: dec!(1000),
            schedule: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the flat monthly amount
    pub fn with_installment(mut self, amount: Decimal) -> Self {
        self.installment = amount;
        self
    }

    /// Uses a per-installment schedule; `None` entries fall back to the flat amount
    ///
    /// Also sets the duration to the schedule length.
    pub fn with_schedule(mut self, amounts: Vec<Option<Decimal>>) -> Self {
        self.duration = amounts.len() as u32;
        self.schedule = Some(amounts);
        self
    }

    /// Builds the plan, panicking when it is invalid
    pub fn build(self) -> Plan {
        let money = |amount: Decimal| Money::new(amount, Currency::INR);
        let flat = money(self.installment);

        let (schedule, total) = match &self.schedule {
            Some(amounts) => {
                let entries = amounts
                    .iter()
                    .map(|amount| ScheduleEntry {
                        installment_amount: amount.map(money),
                        dividend: None,
                        payable_amount: None,
                    })
                    .collect();
                let total: Decimal = amounts.iter().map(|a| a.unwrap_or(self.installment)).sum();
                (
                    ScheduleSource::PerInstallment { entries, flat_amount: Some(flat) },
                    total,
                )
            }
            None => (
                ScheduleSource::FlatMonthly { amount: flat },
                self.installment * Decimal::from(self.duration),
            ),
        };

        Plan::new(self.name, money(total), self.duration, PlanType::Monthly, schedule)
            .unwrap_or_else(|e| panic!("invalid test plan: {e}"))
    }
}

/// Builder for enrollments
pub struct TestEnrollmentBuilder {
    member_number: String,
    start_date: NaiveDate,
    current_arrear: Option<Decimal>,
}

impl Default for TestEnrollmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnrollmentBuilder {
    pub fn new() -> Self {
        Self {
            member_number: "M-001".to_string(),
            start_date: DateFixtures::enrollment_start(),
            current_arrear: None,
        }
    }

    pub fn with_member_number(mut self, member_number: impl Into<String>) -> Self {
        self.member_number = member_number.into();
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    /// Presets the cached arrear
    pub fn with_current_arrear(mut self, arrear: Decimal) -> Self {
        self.current_arrear = Some(arrear);
        self
    }

    /// Builds an active enrollment of a fresh customer in `plan`
    pub fn build(self, plan: &Plan) -> Enrollment {
        let mut enrollment = Enrollment::new(CustomerId::new(), plan, self.member_number, self.start_date);
        if let Some(arrear) = self.current_arrear {
            enrollment.current_arrear = Money::new(arrear, plan.currency());
        }
        enrollment
    }
}

/// Builder for already-issued invoices
///
/// Produces stored-looking invoices without running assembly, for tests that
/// need a specific chain state.
pub struct TestInvoiceBuilder {
    enrollment_id: EnrollmentId,
    customer_id: CustomerId,
    plan_id: PlanId,
    currency: Currency,
    invoice_number: String,
    invoice_date: NaiveDate,
    due_number: u32,
    due_amount: Decimal,
    arrear_amount: Decimal,
    received_amount: Decimal,
    balance_amount: Decimal,
    previous: Option<Invoice>,
}

impl TestInvoiceBuilder {
    /// Starts an invoice for `enrollment`, dated on the carry fixture day
    pub fn for_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            enrollment_id: enrollment.id,
            customer_id: enrollment.customer_id,
            plan_id: enrollment.plan_id,
            currency: enrollment.total_due.currency(),
            invoice_number: "000001".to_string(),
            invoice_date: DateFixtures::carry_day(),
            due_number: 1,
            due_amount: dec!(1000),
            arrear_amount: Decimal::ZERO,
            received_amount: Decimal::ZERO,
            balance_amount: dec!(1000),
            previous: None,
        }
    }

    pub fn with_invoice_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = number.into();
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.invoice_date = date;
        self
    }

    pub fn with_due_number(mut self, due_number: u32) -> Self {
        self.due_number = due_number;
        self
    }

    pub fn with_arrear(mut self, amount: Decimal) -> Self {
        self.arrear_amount = amount;
        self
    }

    pub fn with_received(mut self, amount: Decimal) -> Self {
        self.received_amount = amount;
        self
    }

    pub fn with_balance(mut self, amount: Decimal) -> Self {
        self.balance_amount = amount;
        self
    }

    /// Chains the invoice after `previous`
    pub fn after(mut self, previous: &Invoice) -> Self {
        self.previous = Some(previous.clone());
        self
    }

    pub fn build(self) -> Invoice {
        let money = |amount: Decimal| Money::new(amount, self.currency);
        let previous_balance = self
            .previous
            .as_ref()
            .map(|p| p.balance_amount)
            .unwrap_or_else(|| money(self.due_amount));
        let payment_month = BillingCalendar::effective_billing_date(self.invoice_date)
            .and_then(BillingCalendar::payment_month_label)
            .unwrap_or_else(|e| panic!("invalid test invoice date: {e}"));

        let draft = InvoiceDraft {
            enrollment_id: self.enrollment_id,
            customer_id: self.customer_id,
            plan_id: self.plan_id,
            due_number: self.due_number,
            due_number_source: DueNumberSource::Calculated,
            invoice_date: self.invoice_date,
            phase: BillingPhase::for_date(self.invoice_date),
            due_amount: money(self.due_amount),
            arrear_amount: money(self.arrear_amount),
            received_amount: money(self.received_amount),
            received_arrear_amount: money(Decimal::ZERO),
            previous_balance,
            balance_amount: money(self.balance_amount),
            total_amount: money(self.due_amount + self.arrear_amount),
            payment_month,
            previous_invoice_id: self.previous.as_ref().map(|p| p.id),
        };
        Invoice::issue(draft, self.invoice_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_builder_defaults() {
        let plan = TestPlanBuilder::new().build();
        assert_eq!(plan.duration, 20);
        assert_eq!(plan.total_amount.amount(), dec!(20000));
        assert_eq!(plan.due_amount_for_installment(20).unwrap().amount(), dec!(1000));
    }

    #[test]
    fn test_plan_builder_schedule_gap_uses_flat_amount() {
        let plan = TestPlanBuilder::new()
            .with_installment(dec!(800))
            .with_schedule(vec![Some(dec!(1000)), None, Some(dec!(1200))])
            .build();
        assert_eq!(plan.duration, 3);
        assert_eq!(plan.due_amount_for_installment(2).unwrap().amount(), dec!(800));
        assert_eq!(plan.total_amount.amount(), dec!(3000));
    }

    #[test]
    fn test_enrollment_builder() {
        let plan = TestPlanBuilder::new().build();
        let enrollment = TestEnrollmentBuilder::new()
            .with_member_number("M-777")
            .with_current_arrear(dec!(250))
            .build(&plan);
        assert_eq!(enrollment.plan_id, plan.id);
        assert_eq!(enrollment.member_number, "M-777");
        assert_eq!(enrollment.current_arrear.amount(), dec!(250));
        assert!(enrollment.is_active());
    }

    #[test]
    fn test_invoice_builder_chains() {
        let plan = TestPlanBuilder::new().build();
        let enrollment = TestEnrollmentBuilder::new().build(&plan);
        let first = TestInvoiceBuilder::for_enrollment(&enrollment).build();
        let second = TestInvoiceBuilder::for_enrollment(&enrollment)
            .with_invoice_number("000002")
            .on(DateFixtures::reset_day())
            .with_due_number(3)
            .with_arrear(dec!(1000))
            .after(&first)
            .build();

        assert_eq!(second.previous_invoice_id, Some(first.id));
        assert_eq!(second.phase, BillingPhase::Reset);
        assert_eq!(second.payment_month, "April 2024");
        assert_eq!(second.total_amount.amount(), dec!(2000));
        assert!(second.invoice_date > first.invoice_date);
    }
}
