//! Arrear refresh DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_billing::{
    FailedEntry, RefreshEntry, RefreshReport, RefreshState, SeedReport, SkippedEntry,
};

/// Query string of a refresh run
#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    /// Write regardless of the calendar
    #[serde(default)]
    pub force: bool,
    /// Run as if today were this date
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedArrear {
    pub enrollment_id: Uuid,
    pub state: String,
    pub arrear: Decimal,
}

impl From<RefreshEntry> for UpdatedArrear {
    fn from(entry: RefreshEntry) -> Self {
        let state = match entry.state {
            RefreshState::NoInvoiceYet => "no_invoice_yet",
            RefreshState::DueOnePending => "due_one_pending",
            RefreshState::DueTwoPlusPending => "due_two_plus_pending",
        };
        Self {
            enrollment_id: *entry.enrollment_id.as_uuid(),
            state: state.to_string(),
            arrear: entry.arrear.amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollmentNote {
    pub enrollment_id: Uuid,
    pub message: String,
}

impl From<SkippedEntry> for EnrollmentNote {
    fn from(entry: SkippedEntry) -> Self {
        Self {
            enrollment_id: *entry.enrollment_id.as_uuid(),
            message: entry.reason,
        }
    }
}

impl From<FailedEntry> for EnrollmentNote {
    fn from(entry: FailedEntry) -> Self {
        Self {
            enrollment_id: *entry.enrollment_id.as_uuid(),
            message: entry.error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub as_of: NaiveDate,
    pub forced: bool,
    pub updated: Vec<UpdatedArrear>,
    pub skipped: Vec<EnrollmentNote>,
    pub errors: Vec<EnrollmentNote>,
}

impl RefreshResponse {
    pub fn new(as_of: NaiveDate, forced: bool, report: RefreshReport) -> Self {
        Self {
            as_of,
            forced,
            updated: report.updated.into_iter().map(Into::into).collect(),
            skipped: report.skipped.into_iter().map(Into::into).collect(),
            errors: report.errors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedResponse {
    pub seeded: Vec<UpdatedArrear>,
    pub skipped: Vec<EnrollmentNote>,
    pub errors: Vec<EnrollmentNote>,
}

impl From<SeedReport> for SeedResponse {
    fn from(report: SeedReport) -> Self {
        Self {
            seeded: report.seeded.into_iter().map(Into::into).collect(),
            skipped: report.skipped.into_iter().map(Into::into).collect(),
            errors: report.errors.into_iter().map(Into::into).collect(),
        }
    }
}
