//! Periodic arrear refresh and initial arrear seeding
//!
//! The refresh recomputes each active enrollment's cached `current_arrear`
//! from its most recent invoice, but only writes on the day its state allows:
//!
//! | State                | Arrear                | Written on          |
//! |----------------------|-----------------------|---------------------|
//! | `NoInvoiceYet`       | zero                  | last day of month   |
//! | `DueOnePending`      | latest invoice balance| last day of month   |
//! | `DueTwoPlusPending`  | latest invoice balance| the 21st            |
//!
//! Seeding is a separate administrative step that sets the cached arrear of
//! enrollments without invoices to their first installment. Neither path
//! feeds invoice assembly.
//!
//! Both are batch jobs: one enrollment failing is recorded in the report
//! and the batch moves on.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use core_kernel::{BillingCalendar, BillingPhase, EnrollmentId, Money, PlanId};

use crate::enrollment::Enrollment;
use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::locks::EnrollmentLocks;
use crate::plan::Plan;
use crate::ports::{BillingPort, BillingPortExt};

/// Where an enrollment stands in its billing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    NoInvoiceYet,
    DueOnePending,
    DueTwoPlusPending,
}

impl RefreshState {
    /// Classifies an enrollment by its most recent invoice
    pub fn from_latest(latest: Option<&Invoice>) -> Self {
        match latest {
            None => RefreshState::NoInvoiceYet,
            Some(invoice) if invoice.due_number == 1 => RefreshState::DueOnePending,
            Some(_) => RefreshState::DueTwoPlusPending,
        }
    }

    /// Returns true if the refresh may write this state's arrear on `today`
    pub fn is_write_day(&self, today: NaiveDate) -> bool {
        match self {
            RefreshState::NoInvoiceYet | RefreshState::DueOnePending => BillingCalendar::is_month_end(today),
            RefreshState::DueTwoPlusPending => BillingPhase::for_date(today).is_reset(),
        }
    }

    fn wait_reason(&self) -> &'static str {
        match self {
            RefreshState::NoInvoiceYet | RefreshState::DueOnePending => "waiting for month end",
            RefreshState::DueTwoPlusPending => "waiting for the 21st",
        }
    }
}

/// An enrollment whose arrear was written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshEntry {
    pub enrollment_id: EnrollmentId,
    pub state: RefreshState,
    pub arrear: Money,
}

/// An enrollment the job left untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub enrollment_id: EnrollmentId,
    pub reason: String,
}

/// An enrollment the job failed on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    pub enrollment_id: EnrollmentId,
    pub error: String,
}

/// Outcome of an arrear refresh run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    pub updated: Vec<RefreshEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub errors: Vec<FailedEntry>,
}

/// Outcome of an initial arrear seeding run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedReport {
    pub seeded: Vec<RefreshEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub errors: Vec<FailedEntry>,
}

/// Service maintaining the cached arrear of enrollments
pub struct ArrearRefreshService {
    port: Arc<dyn BillingPort>,
    locks: EnrollmentLocks,
}

impl ArrearRefreshService {
    /// Creates a refresh service sharing the invoice writers' lock registry
    pub fn new(port: Arc<dyn BillingPort>, locks: EnrollmentLocks) -> Self {
        Self { port, locks }
    }

    /// Recomputes the cached arrear of every active enrollment
    ///
    /// # Arguments
    ///
    /// * `today` - The calendar day deciding which states may be written
    /// * `force` - Write every enrollment regardless of the day
    ///
    /// # Errors
    ///
    /// Only when the active enrollments cannot be listed. Failures on a
    /// single enrollment end up in `RefreshReport::errors`.
    pub async fn refresh(&self, today: NaiveDate, force: bool) -> Result<RefreshReport, BillingError> {
        let enrollments = self.port.list_active_enrollments().await?;
        let mut report = RefreshReport::default();

        info!(%today, force, enrollments = enrollments.len(), "Arrear refresh started");

        for enrollment in enrollments {
            match self.refresh_one(&enrollment, today, force).await {
                Ok(entry) => {
                    info!(
                        enrollment_id = %entry.enrollment_id,
                        state = ?entry.state,
                        arrear = %entry.arrear.amount(),
                        "Arrear refreshed"
                    );
                    report.updated.push(entry);
                }
                Err(SkipOrFail::Skip(skipped)) => {
                    debug!(enrollment_id = %skipped.enrollment_id, reason = %skipped.reason, "Arrear refresh skipped");
                    report.skipped.push(skipped);
                }
                Err(SkipOrFail::Fail(e)) => {
                    warn!(enrollment_id = %enrollment.id, error = %e, "Arrear refresh failed");
                    report.errors.push(FailedEntry {
                        enrollment_id: enrollment.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "Arrear refresh finished"
        );
        Ok(report)
    }

    async fn refresh_one(
        &self,
        enrollment: &Enrollment,
        today: NaiveDate,
        force: bool,
    ) -> Result<RefreshEntry, SkipOrFail> {
        let _guard = self.locks.acquire(enrollment.id).await;

        let latest = self.port.latest_invoice(enrollment.id).await?;
        let state = RefreshState::from_latest(latest.as_ref());

        if !force && !state.is_write_day(today) {
            return Err(SkipOrFail::Skip(SkippedEntry {
                enrollment_id: enrollment.id,
                reason: state.wait_reason().to_string(),
            }));
        }

        let arrear = latest
            .map(|invoice| invoice.balance_amount)
            .unwrap_or_else(|| Money::zero(enrollment.current_arrear.currency()));

        self.port
            .update_enrollment_arrear(enrollment.id, arrear, Utc::now())
            .await?;

        Ok(RefreshEntry {
            enrollment_id: enrollment.id,
            state,
            arrear,
        })
    }

    /// Seeds the cached arrear of invoice-less enrollments with their first installment
    ///
    /// Enrollments that already have invoices are skipped.
    pub async fn seed_initial_arrears(&self) -> Result<SeedReport, BillingError> {
        let enrollments = self.port.list_active_enrollments().await?;
        let mut plans: HashMap<PlanId, Plan> = HashMap::new();
        let mut report = SeedReport::default();

        for enrollment in enrollments {
            let _guard = self.locks.acquire(enrollment.id).await;

            match self.seed_one(&enrollment, &mut plans).await {
                Ok(Some(arrear)) => {
                    info!(enrollment_id = %enrollment.id, arrear = %arrear.amount(), "Initial arrear seeded");
                    report.seeded.push(RefreshEntry {
                        enrollment_id: enrollment.id,
                        state: RefreshState::NoInvoiceYet,
                        arrear,
                    });
                }
                Ok(None) => report.skipped.push(SkippedEntry {
                    enrollment_id: enrollment.id,
                    reason: "enrollment already has invoices".to_string(),
                }),
                Err(e) => {
                    warn!(enrollment_id = %enrollment.id, error = %e, "Initial arrear seeding failed");
                    report.errors.push(FailedEntry {
                        enrollment_id: enrollment.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn seed_one(
        &self,
        enrollment: &Enrollment,
        plans: &mut HashMap<PlanId, Plan>,
    ) -> Result<Option<Money>, BillingError> {
        if self.port.has_invoices(enrollment.id).await? {
            return Ok(None);
        }

        if !plans.contains_key(&enrollment.plan_id) {
            let plan = self.port.get_plan(enrollment.plan_id).await?;
            plans.insert(plan.id, plan);
        }
        let plan = plans
            .get(&enrollment.plan_id)
            .ok_or_else(|| BillingError::PlanNotFound(enrollment.plan_id.to_string()))?;

        let arrear = plan.due_amount_for_installment(1)?;
        self.port
            .update_enrollment_arrear(enrollment.id, arrear, Utc::now())
            .await?;
        Ok(Some(arrear))
    }
}

enum SkipOrFail {
    Skip(SkippedEntry),
    Fail(BillingError),
}

impl From<core_kernel::PortError> for SkipOrFail {
    fn from(err: core_kernel::PortError) -> Self {
        SkipOrFail::Fail(err.into())
    }
}
