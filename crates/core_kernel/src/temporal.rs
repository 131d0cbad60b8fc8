//! Billing calendar
//!
//! Chit fund billing runs on calendar days, not instants. Two days of the
//! month carry special meaning:
//!
//! - **Cutoff day (20th)**: an invoice dated after the cutoff belongs to the
//!   following month's installment.
//! - **Reset day (21st)**: arrears and balances are recomputed from the full
//!   due + arrear formula instead of being carried forward.
//!
//! Every calculator asks this module which [`BillingPhase`] a date falls in
//! instead of testing the day number itself.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Last day of the month that still belongs to the current month's installment
pub const CUTOFF_DAY: u32 = 20;

/// Day of the month on which arrears are re-billed
pub const RESET_DAY: u32 = 21;

/// Errors related to calendar operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Date out of supported range: {0}")]
    OutOfRange(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Timezone used to derive the business calendar day from a UTC instant
///
/// Wraps chrono_tz::Tz with string serialization ("Asia/Kolkata").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the IANA name of the timezone
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Returns the local calendar day of a UTC instant
    ///
    /// Time of day is discarded: billing only ever compares calendar days.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Returns today's calendar day in this timezone
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Kolkata)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which formula an invoice date selects
///
/// Computed once per invoice date and threaded through the arrear and
/// balance calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPhase {
    /// The 21st: unpaid balance rolls into arrears, balance is re-billed
    Reset,
    /// Any other day: arrears carried unchanged, balance moves by payments
    Carry,
}

impl BillingPhase {
    /// Returns the phase for a calendar day
    pub fn for_date(date: NaiveDate) -> Self {
        if date.day() == RESET_DAY {
            BillingPhase::Reset
        } else {
            BillingPhase::Carry
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, BillingPhase::Reset)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPhase::Reset => "reset",
            BillingPhase::Carry => "carry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reset" => Some(BillingPhase::Reset),
            "carry" => Some(BillingPhase::Carry),
            _ => None,
        }
    }
}

/// Month arithmetic for the billing cycle
pub struct BillingCalendar;

impl BillingCalendar {
    /// Returns a month counter (`year * 12 + month`) used to diff months
    pub fn month_index(date: NaiveDate) -> i64 {
        i64::from(date.year()) * 12 + i64::from(date.month())
    }

    /// Returns the first day of the month following `date`
    pub fn first_of_next_month(date: NaiveDate) -> Result<NaiveDate, TemporalError> {
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| TemporalError::OutOfRange(format!("{}-{:02}-01", year, month)))
    }

    /// Returns the date whose month decides the installment for `date`
    ///
    /// Dates after the cutoff day move to the first of the next month;
    /// all other dates are returned unchanged.
    pub fn effective_billing_date(date: NaiveDate) -> Result<NaiveDate, TemporalError> {
        if date.day() > CUTOFF_DAY {
            Self::first_of_next_month(date)
        } else {
            Ok(date)
        }
    }

    /// Returns the last calendar day of `date`'s month
    pub fn last_day_of_month(date: NaiveDate) -> Result<NaiveDate, TemporalError> {
        Self::first_of_next_month(date)?
            .pred_opt()
            .ok_or_else(|| TemporalError::OutOfRange(date.to_string()))
    }

    /// Returns true if `date` is the last calendar day of its month
    pub fn is_month_end(date: NaiveDate) -> bool {
        date.succ_opt().map_or(true, |next| next.month() != date.month())
    }

    /// Returns the "March 2024" style label of the month a date bills for
    pub fn payment_month_label(date: NaiveDate) -> Result<String, TemporalError> {
        let effective = Self::effective_billing_date(date)?;
        Ok(effective.format("%B %Y").to_string())
    }
}
