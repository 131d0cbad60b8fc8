//! Property-Based Test Generators
//!
//! Proptest strategies producing billing dates and amounts that respect the
//! domain's ranges.

use chrono::{Datelike, NaiveDate};
use core_kernel::{Currency, Money, RESET_DAY};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for any valid calendar date between 2000 and 2099
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=31).prop_filter_map("invalid day of month", |(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d)
    })
}

/// Strategy for reset days (the 21st)
pub fn reset_day_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12).prop_filter_map("invalid reset day", |(y, m)| {
        NaiveDate::from_ymd_opt(y, m, RESET_DAY)
    })
}

/// Strategy for carry days (anything but the 21st)
pub fn carry_day_strategy() -> impl Strategy<Value = NaiveDate> {
    date_strategy().prop_filter("reset day", |d| d.day() != RESET_DAY)
}

/// Strategy for an enrollment start and an invoice date on or after it
pub fn enrollment_and_invoice_dates() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (date_strategy(), 0i64..3650).prop_filter_map("date overflow", |(start, offset)| {
        start
            .checked_add_signed(chrono::Duration::days(offset))
            .map(|invoice| (start, invoice))
    })
}

/// Strategy for non-negative rupee amounts with paise
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|paise| Decimal::new(paise, 2))
}

/// Strategy for non-negative INR money
pub fn inr_strategy() -> impl Strategy<Value = Money> {
    amount_strategy().prop_map(|amount| Money::new(amount, Currency::INR))
}

/// Strategy for plan durations
pub fn duration_strategy() -> impl Strategy<Value = u32> {
    1u32..=60
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_reset_days_are_the_21st(date in reset_day_strategy()) {
            prop_assert_eq!(date.day(), 21);
        }

        #[test]
        fn prop_carry_days_skip_the_21st(date in carry_day_strategy()) {
            prop_assert_ne!(date.day(), 21);
        }

        #[test]
        fn prop_invoice_not_before_enrollment((start, invoice) in enrollment_and_invoice_dates()) {
            prop_assert!(invoice >= start);
        }

        #[test]
        fn prop_amounts_non_negative(money in inr_strategy()) {
            prop_assert!(!money.is_negative());
        }
    }
}
