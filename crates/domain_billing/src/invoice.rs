//! Invoices
//!
//! An invoice is the immutable record of one billing event for an
//! enrollment. [`InvoiceDraft`] holds the computed figures; it becomes an
//! [`Invoice`] once an invoice number has been allocated.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BillingPhase, CustomerId, EnrollmentId, InvoiceId, Money, PlanId};

/// How the due number of an invoice was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueNumberSource {
    /// Derived from the enrollment start and invoice date
    Calculated,
    /// Supplied by the caller and only range-checked
    Manual,
}

impl DueNumberSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueNumberSource::Calculated => "calculated",
            DueNumberSource::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "calculated" => Some(DueNumberSource::Calculated),
            "manual" => Some(DueNumberSource::Manual),
            _ => None,
        }
    }
}

/// The computed figures of an invoice, before a number is allocated
///
/// Also returned as-is by invoice previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub enrollment_id: EnrollmentId,
    pub customer_id: CustomerId,
    pub plan_id: PlanId,
    pub due_number: u32,
    pub due_number_source: DueNumberSource,
    pub invoice_date: NaiveDate,
    pub phase: BillingPhase,
    /// Installment amount from the plan schedule
    pub due_amount: Money,
    /// Carried from the immediately prior invoice
    pub arrear_amount: Money,
    pub received_amount: Money,
    /// Payment applied against arrears, tracked separately from `received_amount`
    pub received_arrear_amount: Money,
    /// Balance the carry formula started from
    pub previous_balance: Money,
    pub balance_amount: Money,
    /// `due_amount + arrear_amount`
    pub total_amount: Money,
    /// "March 2024" style label of the month billed
    pub payment_month: String,
    /// The invoice this one was computed from
    pub previous_invoice_id: Option<InvoiceId>,
}

/// A persisted invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Zero-padded global sequence number
    pub invoice_number: String,
    pub enrollment_id: EnrollmentId,
    pub customer_id: CustomerId,
    pub plan_id: PlanId,
    pub due_number: u32,
    pub due_number_source: DueNumberSource,
    pub invoice_date: NaiveDate,
    pub phase: BillingPhase,
    pub due_amount: Money,
    pub arrear_amount: Money,
    pub received_amount: Money,
    pub received_arrear_amount: Money,
    pub previous_balance: Money,
    pub balance_amount: Money,
    pub total_amount: Money,
    pub payment_month: String,
    pub previous_invoice_id: Option<InvoiceId>,
    pub created_at: DateTime<Utc>,
    /// Set when an administrator corrected received or balance amounts
    pub corrected_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Issues a draft under an allocated invoice number
    pub fn issue(draft: InvoiceDraft, invoice_number: String) -> Self {
        Self {
            id: InvoiceId::new_v7(),
            invoice_number,
            enrollment_id: draft.enrollment_id,
            customer_id: draft.customer_id,
            plan_id: draft.plan_id,
            due_number: draft.due_number,
            due_number_source: draft.due_number_source,
            invoice_date: draft.invoice_date,
            phase: draft.phase,
            due_amount: draft.due_amount,
            arrear_amount: draft.arrear_amount,
            received_amount: draft.received_amount,
            received_arrear_amount: draft.received_arrear_amount,
            previous_balance: draft.previous_balance,
            balance_amount: draft.balance_amount,
            total_amount: draft.total_amount,
            payment_month: draft.payment_month,
            previous_invoice_id: draft.previous_invoice_id,
            created_at: Utc::now(),
            corrected_at: None,
        }
    }

    /// Total payment this invoice recorded
    pub fn amount_paid(&self) -> Money {
        self.received_amount + self.received_arrear_amount
    }
}

/// Administrative correction of an issued invoice
///
/// Amounts are in the invoice's currency. Later invoices are not recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCorrection {
    pub received_amount: Option<Decimal>,
    pub balance_amount: Option<Decimal>,
}

impl InvoiceCorrection {
    pub fn is_empty(&self) -> bool {
        self.received_amount.is_none() && self.balance_amount.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn inr(v: rust_decimal::Decimal) -> Money {
        Money::new(v, Currency::INR)
    }

    fn draft(date: NaiveDate) -> InvoiceDraft {
        InvoiceDraft {
            enrollment_id: EnrollmentId::new(),
            customer_id: CustomerId::new(),
            plan_id: PlanId::new(),
            due_number: 1,
            due_number_source: DueNumberSource::Calculated,
            invoice_date: date,
            phase: BillingPhase::for_date(date),
            due_amount: inr(dec!(1000)),
            arrear_amount: inr(dec!(0)),
            received_amount: inr(dec!(400)),
            received_arrear_amount: inr(dec!(100)),
            previous_balance: inr(dec!(1000)),
            balance_amount: inr(dec!(500)),
            total_amount: inr(dec!(1000)),
            payment_month: "February 2024".to_string(),
            previous_invoice_id: None,
        }
    }

    #[test]
    fn test_issue_copies_draft() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let d = draft(date);
        let invoice = Invoice::issue(d.clone(), "000001".to_string());

        assert_eq!(invoice.invoice_number, "000001");
        assert_eq!(invoice.enrollment_id, d.enrollment_id);
        assert_eq!(invoice.balance_amount, d.balance_amount);
        assert!(invoice.corrected_at.is_none());
        assert_eq!(invoice.amount_paid(), inr(dec!(500)));
    }

    #[test]
    fn test_empty_correction() {
        assert!(InvoiceCorrection::default().is_empty());
        let correction = InvoiceCorrection { received_amount: Some(dec!(10)), balance_amount: None };
        assert!(!correction.is_empty());
    }
}
