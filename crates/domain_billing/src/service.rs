//! Invoice services
//!
//! `InvoiceService` is the only writer on the invoice path. It enrolls
//! customers, assembles invoices from the calculators, and persists them
//! through the `BillingPort`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use core_kernel::{BillingCalendar, Currency, CustomerId, EnrollmentId, InvoiceId, Money, PlanId, PortError};

use crate::arrear::calculate_arrear;
use crate::balance::{calculate_balance, opening_balance, BalanceInputs};
use crate::config::BillingConfig;
use crate::due_number::{calculate_due_number, validate_manual_due_number};
use crate::enrollment::Enrollment;
use crate::error::BillingError;
use crate::invoice::{DueNumberSource, Invoice, InvoiceCorrection, InvoiceDraft};
use crate::locks::EnrollmentLocks;
use crate::plan::Plan;
use crate::ports::{BillingPort, EnrollmentQuery};

/// Request to enroll a customer in a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub customer_id: CustomerId,
    pub plan_id: PlanId,
    pub member_number: String,
    pub start_date: NaiveDate,
}

/// Request to create (or preview) an invoice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub customer_id: CustomerId,
    pub plan_id: PlanId,
    /// Defaults to today in the configured timezone
    pub invoice_date: Option<NaiveDate>,
    /// Defaults to zero
    pub received_amount: Option<Decimal>,
    /// Defaults to zero
    pub received_arrear_amount: Option<Decimal>,
    /// Overrides the calculated due number; only range-checked
    pub manual_due_number: Option<i64>,
}

/// Service for plans, enrollments and invoices
pub struct InvoiceService {
    port: Arc<dyn BillingPort>,
    config: BillingConfig,
    locks: EnrollmentLocks,
}

impl InvoiceService {
    /// Creates a service with its own lock registry
    pub fn new(port: Arc<dyn BillingPort>, config: BillingConfig) -> Self {
        Self::with_locks(port, config, EnrollmentLocks::new())
    }

    /// Creates a service sharing a lock registry with other writers
    pub fn with_locks(port: Arc<dyn BillingPort>, config: BillingConfig, locks: EnrollmentLocks) -> Self {
        Self { port, config, locks }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn locks(&self) -> &EnrollmentLocks {
        &self.locks
    }

    // ========================================================================
    // Plans and enrollments
    // ========================================================================

    /// Validates and stores a plan
    pub async fn register_plan(&self, plan: Plan) -> Result<Plan, BillingError> {
        plan.validate()?;
        self.port.save_plan(&plan).await?;
        info!(plan_id = %plan.id, name = %plan.name, duration = plan.duration, "Plan registered");
        Ok(plan)
    }

    /// Retrieves a plan
    pub async fn get_plan(&self, plan_id: PlanId) -> Result<Plan, BillingError> {
        self.load_plan(plan_id).await
    }

    /// Lists all plans
    pub async fn list_plans(&self) -> Result<Vec<Plan>, BillingError> {
        Ok(self.port.list_plans().await?)
    }

    /// Enrolls a customer in a plan
    ///
    /// # Errors
    ///
    /// - `PlanNotFound` if the plan does not exist
    /// - `DuplicateEnrollment` if the customer is already enrolled in the plan
    /// - `DuplicateMemberNumber` if the member number is taken
    pub async fn enroll(&self, request: EnrollRequest) -> Result<Enrollment, BillingError> {
        let member_number = request.member_number.trim();
        if member_number.is_empty() {
            return Err(BillingError::validation("member number must not be empty"));
        }

        let plan = self.load_plan(request.plan_id).await?;

        if self
            .port
            .find_enrollment(request.customer_id, request.plan_id)
            .await?
            .is_some()
        {
            return Err(BillingError::DuplicateEnrollment {
                customer_id: request.customer_id.to_string(),
                plan_id: request.plan_id.to_string(),
            });
        }

        let enrollment = Enrollment::new(request.customer_id, &plan, member_number, request.start_date);
        self.port.create_enrollment(&enrollment).await.map_err(|e| {
            if e.is_conflict() {
                BillingError::DuplicateMemberNumber(member_number.to_string())
            } else {
                e.into()
            }
        })?;

        info!(
            enrollment_id = %enrollment.id,
            customer_id = %enrollment.customer_id,
            plan_id = %enrollment.plan_id,
            member_number = %enrollment.member_number,
            start_date = %enrollment.start_date,
            "Customer enrolled"
        );
        Ok(enrollment)
    }

    /// Retrieves an enrollment
    pub async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, BillingError> {
        self.load_enrollment(enrollment_id).await
    }

    /// Lists enrollments matching a query
    pub async fn list_enrollments(&self, query: EnrollmentQuery) -> Result<Vec<Enrollment>, BillingError> {
        Ok(self.port.list_enrollments(query).await?)
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Creates and persists the next invoice of a (customer, plan) enrollment
    ///
    /// This method:
    /// 1. Resolves the enrollment and its plan
    /// 2. Determines the due number (manual override or calculated)
    /// 3. Looks up the installment amount
    /// 4. Carries the arrear from the prior invoice
    /// 5. Computes previous balance, balance and total
    /// 6. Allocates an invoice number and persists atomically
    ///
    /// Failures in steps 1 to 5 leave no state behind. A failed write leaves
    /// no invoice; the allocated number is not reused.
    pub async fn create_invoice(&self, request: CreateInvoiceRequest) -> Result<Invoice, BillingError> {
        let enrollment = self.resolve_enrollment(request.customer_id, request.plan_id).await?;
        let plan = self.load_plan(enrollment.plan_id).await?;

        let _guard = self.locks.acquire(enrollment.id).await;

        let draft = self.assemble(&enrollment, &plan, &request).await?;
        let sequence = self.port.next_invoice_number().await?;
        let invoice = Invoice::issue(draft, self.config.format_invoice_number(sequence));

        if let Err(e) = self.port.record_invoice(&invoice).await {
            warn!(
                enrollment_id = %enrollment.id,
                invoice_number = %invoice.invoice_number,
                error = %e,
                "Failed to record invoice"
            );
            return Err(e.into());
        }

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            enrollment_id = %enrollment.id,
            due_number = invoice.due_number,
            due_number_source = invoice.due_number_source.as_str(),
            invoice_date = %invoice.invoice_date,
            due_amount = %invoice.due_amount.amount(),
            arrear_amount = %invoice.arrear_amount.amount(),
            received_amount = %invoice.received_amount.amount(),
            balance_amount = %invoice.balance_amount.amount(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Computes the invoice `create_invoice` would produce, without writing
    pub async fn preview_invoice(&self, request: CreateInvoiceRequest) -> Result<InvoiceDraft, BillingError> {
        let enrollment = self.resolve_enrollment(request.customer_id, request.plan_id).await?;
        let plan = self.load_plan(enrollment.plan_id).await?;
        self.assemble(&enrollment, &plan, &request).await
    }

    /// Overwrites the received and/or balance amounts of an issued invoice
    ///
    /// The enrollment's `total_paid` shifts by the change in received amount.
    /// Later invoices keep the figures they were computed with.
    pub async fn correct_invoice(
        &self,
        invoice_id: InvoiceId,
        correction: InvoiceCorrection,
    ) -> Result<Invoice, BillingError> {
        if correction.is_empty() {
            return Err(BillingError::validation("correction changes nothing"));
        }

        let enrollment_id = self.load_invoice(invoice_id).await?.enrollment_id;
        let _guard = self.locks.acquire(enrollment_id).await;

        // Re-read under the lock
        let mut invoice = self.load_invoice(invoice_id).await?;
        let currency = invoice.due_amount.currency();
        let mut paid_delta = Money::zero(currency);

        if let Some(received) = correction.received_amount {
            let received = to_money(Some(received), currency, "received_amount")?;
            paid_delta = received.checked_sub(&invoice.received_amount)?;
            invoice.received_amount = received;
        }
        if let Some(balance) = correction.balance_amount {
            let balance = Money::new(balance, currency);
            if balance.is_negative() && !self.config.allow_negative_balance {
                return Err(BillingError::validation("balance_amount must not be negative"));
            }
            invoice.balance_amount = balance;
        }
        invoice.corrected_at = Some(Utc::now());

        self.port.record_correction(&invoice, paid_delta).await?;

        info!(
            invoice_id = %invoice.id,
            enrollment_id = %invoice.enrollment_id,
            received_amount = %invoice.received_amount.amount(),
            balance_amount = %invoice.balance_amount.amount(),
            paid_delta = %paid_delta.amount(),
            "Invoice corrected"
        );
        Ok(invoice)
    }

    /// Retrieves an invoice
    pub async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, BillingError> {
        self.load_invoice(invoice_id).await
    }

    /// All invoices of an enrollment in ascending date order
    pub async fn invoice_history(&self, enrollment_id: EnrollmentId) -> Result<Vec<Invoice>, BillingError> {
        self.load_enrollment(enrollment_id).await?;
        Ok(self.port.list_invoices(enrollment_id).await?)
    }

    // ========================================================================
    // Assembly
    // ========================================================================

    async fn assemble(
        &self,
        enrollment: &Enrollment,
        plan: &Plan,
        request: &CreateInvoiceRequest,
    ) -> Result<InvoiceDraft, BillingError> {
        let invoice_date = request
            .invoice_date
            .unwrap_or_else(|| self.config.timezone.today());
        let currency = plan.currency();

        let (due_number, due_number_source) = match request.manual_due_number {
            Some(manual) => (
                validate_manual_due_number(manual, plan.duration)?,
                DueNumberSource::Manual,
            ),
            None => (
                calculate_due_number(enrollment.start_date, invoice_date, plan.duration)?,
                DueNumberSource::Calculated,
            ),
        };

        let due_amount = plan.due_amount_for_installment(due_number)?;
        let received_amount = to_money(request.received_amount, currency, "received_amount")?;
        let received_arrear_amount =
            to_money(request.received_arrear_amount, currency, "received_arrear_amount")?;

        let resolution = calculate_arrear(self.port.as_ref(), enrollment.id, invoice_date, currency).await?;
        let previous_balance = opening_balance(resolution.prior.as_ref(), resolution.phase, due_amount);

        let balance_amount = calculate_balance(
            &BalanceInputs {
                due_amount,
                arrear_amount: resolution.arrear,
                received_amount,
                received_arrear_amount,
                previous_balance,
            },
            resolution.phase,
            self.config.balance_policy(),
        )?;
        let total_amount = due_amount.checked_add(&resolution.arrear)?;

        debug!(
            enrollment_id = %enrollment.id,
            due_number,
            phase = ?resolution.phase,
            prior_invoice = ?resolution.prior.as_ref().map(|i| i.id),
            "Invoice assembled"
        );

        Ok(InvoiceDraft {
            enrollment_id: enrollment.id,
            customer_id: enrollment.customer_id,
            plan_id: enrollment.plan_id,
            due_number,
            due_number_source,
            invoice_date,
            phase: resolution.phase,
            due_amount,
            arrear_amount: resolution.arrear,
            received_amount,
            received_arrear_amount,
            previous_balance,
            balance_amount,
            total_amount,
            payment_month: BillingCalendar::payment_month_label(invoice_date)?,
            previous_invoice_id: resolution.prior.map(|i| i.id),
        })
    }

    async fn resolve_enrollment(
        &self,
        customer_id: CustomerId,
        plan_id: PlanId,
    ) -> Result<Enrollment, BillingError> {
        let enrollment = self
            .port
            .find_enrollment(customer_id, plan_id)
            .await?
            .ok_or_else(|| {
                BillingError::EnrollmentNotFound(format!("customer {customer_id} in plan {plan_id}"))
            })?;

        if !enrollment.is_active() {
            return Err(BillingError::validation(format!(
                "enrollment {} is {}",
                enrollment.id,
                enrollment.status.as_str()
            )));
        }
        Ok(enrollment)
    }

    async fn load_plan(&self, plan_id: PlanId) -> Result<Plan, BillingError> {
        self.port
            .get_plan(plan_id)
            .await
            .map_err(|e| not_found_as(e, || BillingError::PlanNotFound(plan_id.to_string())))
    }

    async fn load_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, BillingError> {
        self.port
            .get_enrollment(enrollment_id)
            .await
            .map_err(|e| not_found_as(e, || BillingError::EnrollmentNotFound(enrollment_id.to_string())))
    }

    async fn load_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, BillingError> {
        self.port
            .get_invoice(invoice_id)
            .await
            .map_err(|e| not_found_as(e, || BillingError::InvoiceNotFound(invoice_id.to_string())))
    }
}

fn not_found_as(err: PortError, not_found: impl FnOnce() -> BillingError) -> BillingError {
    if err.is_not_found() {
        not_found()
    } else {
        err.into()
    }
}

/// Converts an optional request amount, defaulting to zero
fn to_money(amount: Option<Decimal>, currency: Currency, field: &str) -> Result<Money, BillingError> {
    match amount {
        None => Ok(Money::zero(currency)),
        Some(value) => Money::non_negative(value, currency)
            .map_err(|_| BillingError::validation(format!("{field} must not be negative"))),
    }
}
