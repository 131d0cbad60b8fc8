//! Due-number calculation
//!
//! The due number is the 1-based installment an invoice covers. It counts
//! calendar months from the enrollment start to the invoice date, after
//! moving invoice dates past the cutoff day into the following month.

use chrono::NaiveDate;

use core_kernel::BillingCalendar;

use crate::error::BillingError;

/// Computes the installment number an invoice date falls into
///
/// # Arguments
///
/// * `enrollment_date` - Start date of the enrollment
/// * `invoice_date` - Calendar day of the invoice
/// * `plan_duration` - Number of installments in the plan
///
/// # Errors
///
/// `InvalidDueNumber` when the invoice predates the enrollment month or
/// falls after the last installment. Values are never clamped.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use domain_billing::due_number::calculate_due_number;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// let on_cutoff = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
/// let after_cutoff = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
///
/// assert_eq!(calculate_due_number(start, on_cutoff, 12).unwrap(), 1);
/// assert_eq!(calculate_due_number(start, after_cutoff, 12).unwrap(), 2);
/// ```
pub fn calculate_due_number(
    enrollment_date: NaiveDate,
    invoice_date: NaiveDate,
    plan_duration: u32,
) -> Result<u32, BillingError> {
    let effective = BillingCalendar::effective_billing_date(invoice_date)?;
    let due_number = BillingCalendar::month_index(effective)
        - BillingCalendar::month_index(enrollment_date)
        + 1;

    check_range(due_number, plan_duration)
}

/// Range-checks a caller-supplied due number
///
/// Manual due numbers bypass the cutoff rule entirely; only
/// `0 < due_number <= plan_duration` is enforced.
pub fn validate_manual_due_number(due_number: i64, plan_duration: u32) -> Result<u32, BillingError> {
    check_range(due_number, plan_duration)
}

fn check_range(due_number: i64, plan_duration: u32) -> Result<u32, BillingError> {
    if due_number < 1 || due_number > i64::from(plan_duration) {
        return Err(BillingError::InvalidDueNumber {
            due_number,
            duration: plan_duration,
        });
    }
    // In range of a u32 duration, so the cast cannot truncate
    Ok(due_number as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cutoff_boundary() {
        let start = date(2024, 1, 5);
        assert_eq!(calculate_due_number(start, date(2024, 1, 20), 12).unwrap(), 1);
        assert_eq!(calculate_due_number(start, date(2024, 1, 21), 12).unwrap(), 2);
    }

    #[test]
    fn test_invoice_before_enrollment_month_rejected() {
        let result = calculate_due_number(date(2024, 3, 1), date(2024, 2, 10), 12);
        assert!(matches!(
            result,
            Err(BillingError::InvalidDueNumber { due_number: 0, duration: 12 })
        ));
    }

    #[test]
    fn test_exhausted_plan_rejected() {
        let result = calculate_due_number(date(2024, 1, 1), date(2024, 9, 1), 6);
        assert!(matches!(
            result,
            Err(BillingError::InvalidDueNumber { due_number: 9, duration: 6 })
        ));
    }

    #[test]
    fn test_last_installment_accepted() {
        assert_eq!(calculate_due_number(date(2024, 1, 1), date(2024, 6, 20), 6).unwrap(), 6);
        assert!(calculate_due_number(date(2024, 1, 1), date(2024, 6, 21), 6).is_err());
    }

    #[test]
    fn test_year_boundary() {
        assert_eq!(calculate_due_number(date(2024, 11, 15), date(2025, 1, 10), 12).unwrap(), 3);
        assert_eq!(calculate_due_number(date(2024, 11, 15), date(2024, 12, 28), 12).unwrap(), 3);
    }

    #[test]
    fn test_enrollment_late_in_month_still_counts_its_month() {
        // Enrolling on the 25th does not shift the enrollment month
        assert_eq!(calculate_due_number(date(2024, 1, 25), date(2024, 1, 26), 12).unwrap(), 2);
    }

    #[test]
    fn test_manual_due_number_range() {
        assert_eq!(validate_manual_due_number(3, 6).unwrap(), 3);
        assert!(validate_manual_due_number(0, 6).is_err());
        assert!(validate_manual_due_number(-2, 6).is_err());
        assert!(validate_manual_due_number(7, 6).is_err());
    }
}
