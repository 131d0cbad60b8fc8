//! Pre-built Test Fixtures
//!
//! Ready-to-use amounts, dates and plans. Values are fixed so tests stay
//! predictable.

use chrono::NaiveDate;
use core_kernel::{Currency, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_billing::{Plan, PlanType, ScheduleEntry, ScheduleSource};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// An INR amount
    pub fn inr(amount: Decimal) -> Money {
        Money::new(amount, Currency::INR)
    }

    /// The standard installment of the fixture plans
    pub fn installment() -> Money {
        Self::inr(dec!(1000))
    }

    /// Zero rupees
    pub fn zero() -> Money {
        Money::zero(Currency::INR)
    }
}

/// Fixture for billing calendar dates
pub struct DateFixtures;

impl DateFixtures {
    /// Builds a date, panicking on an invalid one
    pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| panic!("invalid fixture date {year}-{month}-{day}"))
    }

    /// Enrollment start used across the suite (Feb 10, 2024)
    pub fn enrollment_start() -> NaiveDate {
        Self::ymd(2024, 2, 10)
    }

    /// A carry-phase day before the cutoff (Feb 15, 2024)
    pub fn carry_day() -> NaiveDate {
        Self::ymd(2024, 2, 15)
    }

    /// The cutoff day itself (Mar 20, 2024), still carry
    pub fn cutoff_day() -> NaiveDate {
        Self::ymd(2024, 3, 20)
    }

    /// A reset day (Mar 21, 2024), bills April
    pub fn reset_day() -> NaiveDate {
        Self::ymd(2024, 3, 21)
    }

    /// Last day of a leap February
    pub fn leap_month_end() -> NaiveDate {
        Self::ymd(2024, 2, 29)
    }
}

/// Fixture for plans
pub struct PlanFixtures;

impl PlanFixtures {
    /// A 20-month plan billing 1000 every month
    pub fn flat_monthly() -> Plan {
        Self::flat(20, dec!(1000))
    }

    /// A plan billing the same amount every month
    pub fn flat(duration: u32, installment: Decimal) -> Plan {
        let installment = MoneyFixtures::inr(installment);
        Plan::new(
            format!("Flat {duration} x {}", installment.amount()),
            MoneyFixtures::inr(installment.amount() * Decimal::from(duration)),
            duration,
            PlanType::Monthly,
            ScheduleSource::FlatMonthly { amount: installment },
        )
        .unwrap_or_else(|e| panic!("invalid fixture plan: {e}"))
    }

    /// A plan with an explicit amount per installment
    pub fn per_installment(amounts: &[Decimal]) -> Plan {
        let total: Decimal = amounts.iter().copied().sum();
        let entries = amounts
            .iter()
            .map(|amount| ScheduleEntry::installment(MoneyFixtures::inr(*amount)))
            .collect();
        Plan::new(
            format!("Schedule of {}", amounts.len()),
            MoneyFixtures::inr(total),
            amounts.len() as u32,
            PlanType::Monthly,
            ScheduleSource::PerInstallment { entries, flat_amount: None },
        )
        .unwrap_or_else(|e| panic!("invalid fixture plan: {e}"))
    }
}
