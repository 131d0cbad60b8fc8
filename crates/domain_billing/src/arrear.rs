//! Arrear calculation
//!
//! Arrears originate only from invoice history. For a new invoice the most
//! recent invoice of the enrollment dated strictly before it decides the
//! arrear:
//!
//! | Prior invoice | Phase of new date | Arrear            |
//! |---------------|-------------------|-------------------|
//! | none          | any               | zero              |
//! | exists        | `Reset` (21st)    | prior **balance** |
//! | exists        | `Carry`           | prior **arrear**  |
//!
//! A seeded `Enrollment::current_arrear` is never consulted here.

use chrono::NaiveDate;

use core_kernel::{BillingPhase, Currency, EnrollmentId, Money};

use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::ports::BillingPort;

/// Result of resolving the arrear for a new invoice
#[derive(Debug, Clone)]
pub struct ArrearResolution {
    pub arrear: Money,
    pub phase: BillingPhase,
    /// The immediate predecessor the arrear was taken from
    pub prior: Option<Invoice>,
}

/// Arrear carried into a new invoice given its immediate predecessor
pub fn carried_arrear(prior: Option<&Invoice>, phase: BillingPhase, currency: Currency) -> Money {
    match (prior, phase) {
        (None, _) => Money::zero(currency),
        (Some(prior), BillingPhase::Reset) => prior.balance_amount,
        (Some(prior), BillingPhase::Carry) => prior.arrear_amount,
    }
}

/// Looks up the predecessor of an invoice dated `invoice_date` and computes its arrear
///
/// # Errors
///
/// Propagates persistence failures; the lookup has no side effects.
pub async fn calculate_arrear(
    port: &dyn BillingPort,
    enrollment_id: EnrollmentId,
    invoice_date: NaiveDate,
    currency: Currency,
) -> Result<ArrearResolution, BillingError> {
    let phase = BillingPhase::for_date(invoice_date);
    let prior = port.latest_invoice_before(enrollment_id, invoice_date).await?;
    let arrear = carried_arrear(prior.as_ref(), phase, currency);

    Ok(ArrearResolution { arrear, phase, prior })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{DueNumberSource, InvoiceDraft};
    use core_kernel::{CustomerId, PlanId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn inr(v: Decimal) -> Money {
        Money::new(v, Currency::INR)
    }

    fn prior(arrear: Decimal, balance: Decimal) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        Invoice::issue(
            InvoiceDraft {
                enrollment_id: EnrollmentId::new(),
                customer_id: CustomerId::new(),
                plan_id: PlanId::new(),
                due_number: 1,
                due_number_source: DueNumberSource::Calculated,
                invoice_date: date,
                phase: BillingPhase::Carry,
                due_amount: inr(dec!(1000)),
                arrear_amount: inr(arrear),
                received_amount: inr(dec!(0)),
                received_arrear_amount: inr(dec!(0)),
                previous_balance: inr(balance),
                balance_amount: inr(balance),
                total_amount: inr(dec!(1000) + arrear),
                payment_month: "February 2024".into(),
                previous_invoice_id: None,
            },
            "000001".into(),
        )
    }

    #[test]
    fn test_first_invoice_carries_no_arrear() {
        assert!(carried_arrear(None, BillingPhase::Reset, Currency::INR).is_zero());
        assert!(carried_arrear(None, BillingPhase::Carry, Currency::INR).is_zero());
    }

    #[test]
    fn test_reset_day_rolls_balance_into_arrear() {
        let p = prior(dec!(0), dec!(500));
        assert_eq!(carried_arrear(Some(&p), BillingPhase::Reset, Currency::INR), inr(dec!(500)));
    }

    #[test]
    fn test_carry_day_keeps_prior_arrear() {
        let p = prior(dec!(200), dec!(700));
        assert_eq!(carried_arrear(Some(&p), BillingPhase::Carry, Currency::INR), inr(dec!(200)));
    }
}
