//! PostgreSQL Billing Adapter
//!
//! Implements `BillingPort` on top of `BillingRepository`, translating
//! between domain models and row types.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::BillingPort;
//! use std::sync::Arc;
//!
//! let port: Arc<dyn BillingPort> = Arc::new(PostgresBillingAdapter::new(pool));
//! let invoices = port.list_invoices(enrollment_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BillingPhase, Currency, CustomerId, DomainPort, EnrollmentId, HealthCheckResult,
    HealthCheckable, InvoiceId, Money, PlanId, PortError,
};
use domain_billing::{
    BillingPort, DueNumberSource, Enrollment, EnrollmentQuery, EnrollmentStatus, Invoice, Plan,
    PlanType, ScheduleSource,
};

use crate::repositories::billing::{BillingRepository, EnrollmentRow, InvoiceRow, PlanRow};

/// PostgreSQL-backed implementation of the BillingPort trait
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - unique violations and invoice chain moves -> `PortError::Conflict`
/// - missing rows -> `PortError::NotFound`
/// - undecodable stored values -> `PortError::Transformation`
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    repository: BillingRepository,
}

impl PostgresBillingAdapter {
    /// Creates a new PostgreSQL billing adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillingRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &BillingRepository {
        &self.repository
    }
}

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    /// Checks database connectivity and that the invoice sequence exists
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM pg_class WHERE relkind = 'S' AND relname = 'invoice_number_seq'",
        )
        .fetch_optional(self.repository.pool())
        .await;

        let latency_ms = start.elapsed().as_millis() as u64;
        let (status, message) = match result {
            Ok(Some(_)) => (AdapterHealth::Healthy, None),
            Ok(None) => (
                AdapterHealth::Degraded,
                Some("invoice_number_seq is missing; run migrations".to_string()),
            ),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: "postgres-billing-adapter".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl BillingPort for PostgresBillingAdapter {
    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    async fn save_plan(&self, plan: &Plan) -> Result<(), PortError> {
        let row = plan_to_row(plan)?;
        self.repository.upsert_plan(&row).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(plan_id = %id))]
    async fn get_plan(&self, id: PlanId) -> Result<Plan, PortError> {
        let row = self
            .repository
            .get_plan(*id.as_uuid())
            .await?
            .ok_or_else(|| PortError::not_found("Plan", id))?;
        row_to_plan(row)
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, PortError> {
        self.repository
            .list_plans()
            .await?
            .into_iter()
            .map(row_to_plan)
            .collect()
    }

    #[instrument(skip(self, enrollment), fields(enrollment_id = %enrollment.id))]
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), PortError> {
        self.repository
            .insert_enrollment(&enrollment_to_row(enrollment))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(enrollment_id = %id))]
    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, PortError> {
        let row = self
            .repository
            .get_enrollment(*id.as_uuid())
            .await?
            .ok_or_else(|| PortError::not_found("Enrollment", id))?;
        row_to_enrollment(row)
    }

    async fn find_enrollment(
        &self,
        customer_id: CustomerId,
        plan_id: PlanId,
    ) -> Result<Option<Enrollment>, PortError> {
        self.repository
            .find_enrollment(*customer_id.as_uuid(), *plan_id.as_uuid())
            .await?
            .map(row_to_enrollment)
            .transpose()
    }

    async fn list_enrollments(&self, query: EnrollmentQuery) -> Result<Vec<Enrollment>, PortError> {
        debug!("Listing enrollments with query: {:?}", query);
        self.repository
            .list_enrollments(
                query.customer_id.map(Into::into),
                query.plan_id.map(Into::into),
                query.status.map(|s| s.as_str()),
            )
            .await?
            .into_iter()
            .map(row_to_enrollment)
            .collect()
    }

    #[instrument(skip(self, arrear), fields(enrollment_id = %id))]
    async fn update_enrollment_arrear(
        &self,
        id: EnrollmentId,
        arrear: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PortError> {
        self.repository
            .update_arrear(*id.as_uuid(), arrear.amount(), updated_at)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        let row = self
            .repository
            .get_invoice(*id.as_uuid())
            .await?
            .ok_or_else(|| PortError::not_found("Invoice", id))?;
        row_to_invoice(row)
    }

    async fn latest_invoice_before(
        &self,
        enrollment_id: EnrollmentId,
        date: NaiveDate,
    ) -> Result<Option<Invoice>, PortError> {
        self.repository
            .latest_invoice_before(*enrollment_id.as_uuid(), date)
            .await?
            .map(row_to_invoice)
            .transpose()
    }

    async fn latest_invoice(&self, enrollment_id: EnrollmentId) -> Result<Option<Invoice>, PortError> {
        self.repository
            .latest_invoice(*enrollment_id.as_uuid())
            .await?
            .map(row_to_invoice)
            .transpose()
    }

    async fn list_invoices(&self, enrollment_id: EnrollmentId) -> Result<Vec<Invoice>, PortError> {
        self.repository
            .list_invoices(*enrollment_id.as_uuid())
            .await?
            .into_iter()
            .map(row_to_invoice)
            .collect()
    }

    async fn next_invoice_number(&self) -> Result<u64, PortError> {
        let value = self.repository.next_invoice_number().await?;
        u64::try_from(value).map_err(|_| PortError::transformation(format!("invalid sequence value {value}")))
    }

    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number, enrollment_id = %invoice.enrollment_id))]
    async fn record_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        debug!("Inserting invoice");
        self.repository.insert_invoice(&invoice_to_row(invoice)).await?;
        Ok(())
    }

    #[instrument(skip(self, invoice, paid_delta), fields(invoice_id = %invoice.id))]
    async fn record_correction(&self, invoice: &Invoice, paid_delta: Money) -> Result<(), PortError> {
        self.repository
            .update_correction(&invoice_to_row(invoice), paid_delta.amount())
            .await?;
        Ok(())
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn parse_currency(code: &str) -> Result<Currency, PortError> {
    code.parse::<Currency>()
        .map_err(|_| PortError::transformation(format!("unknown currency '{code}'")))
}

fn money(amount: Decimal, currency: Currency) -> Money {
    Money::new(amount, currency)
}

fn plan_to_row(plan: &Plan) -> Result<PlanRow, PortError> {
    let schedule = serde_json::to_value(&plan.schedule)
        .map_err(|e| PortError::transformation(format!("plan schedule: {e}")))?;
    let duration = i32::try_from(plan.duration)
        .map_err(|_| PortError::validation(format!("plan duration {} too large", plan.duration)))?;

    Ok(PlanRow {
        plan_id: *plan.id.as_uuid(),
        name: plan.name.clone(),
        total_amount: plan.total_amount.amount(),
        currency: plan.currency().code().to_string(),
        duration,
        plan_type: plan.plan_type.as_str().to_string(),
        schedule: Json(schedule),
        created_at: plan.created_at,
    })
}

fn row_to_plan(row: PlanRow) -> Result<Plan, PortError> {
    let currency = parse_currency(&row.currency)?;
    let plan_type = PlanType::parse(&row.plan_type)
        .ok_or_else(|| PortError::transformation(format!("unknown plan type '{}'", row.plan_type)))?;
    let schedule: ScheduleSource = serde_json::from_value(row.schedule.0)
        .map_err(|e| PortError::transformation(format!("plan schedule: {e}")))?;

    Ok(Plan {
        id: PlanId::from_uuid(row.plan_id),
        name: row.name,
        total_amount: money(row.total_amount, currency),
        duration: u32::try_from(row.duration)
            .map_err(|_| PortError::transformation(format!("negative duration {}", row.duration)))?,
        plan_type,
        schedule,
        created_at: row.created_at,
    })
}

fn enrollment_to_row(enrollment: &Enrollment) -> EnrollmentRow {
    EnrollmentRow {
        enrollment_id: *enrollment.id.as_uuid(),
        customer_id: *enrollment.customer_id.as_uuid(),
        plan_id: *enrollment.plan_id.as_uuid(),
        member_number: enrollment.member_number.clone(),
        start_date: enrollment.start_date,
        status: enrollment.status.as_str().to_string(),
        currency: enrollment.total_due.currency().code().to_string(),
        total_paid: enrollment.total_paid.amount(),
        total_due: enrollment.total_due.amount(),
        current_arrear: enrollment.current_arrear.amount(),
        arrear_last_updated: enrollment.arrear_last_updated,
        created_at: enrollment.created_at,
    }
}

fn row_to_enrollment(row: EnrollmentRow) -> Result<Enrollment, PortError> {
    let currency = parse_currency(&row.currency)?;
    let status = EnrollmentStatus::parse(&row.status)
        .ok_or_else(|| PortError::transformation(format!("unknown enrollment status '{}'", row.status)))?;

    Ok(Enrollment {
        id: EnrollmentId::from_uuid(row.enrollment_id),
        customer_id: CustomerId::from_uuid(row.customer_id),
        plan_id: PlanId::from_uuid(row.plan_id),
        member_number: row.member_number,
        start_date: row.start_date,
        status,
        total_paid: money(row.total_paid, currency),
        total_due: money(row.total_due, currency),
        current_arrear: money(row.current_arrear, currency),
        arrear_last_updated: row.arrear_last_updated,
        created_at: row.created_at,
    })
}

fn invoice_to_row(invoice: &Invoice) -> InvoiceRow {
    InvoiceRow {
        invoice_id: *invoice.id.as_uuid(),
        invoice_number: invoice.invoice_number.clone(),
        enrollment_id: *invoice.enrollment_id.as_uuid(),
        customer_id: *invoice.customer_id.as_uuid(),
        plan_id: *invoice.plan_id.as_uuid(),
        // Due numbers are bounded by a plan duration that fits in i32
        due_number: invoice.due_number as i32,
        due_number_source: invoice.due_number_source.as_str().to_string(),
        invoice_date: invoice.invoice_date,
        phase: invoice.phase.as_str().to_string(),
        currency: invoice.due_amount.currency().code().to_string(),
        due_amount: invoice.due_amount.amount(),
        arrear_amount: invoice.arrear_amount.amount(),
        received_amount: invoice.received_amount.amount(),
        received_arrear_amount: invoice.received_arrear_amount.amount(),
        previous_balance: invoice.previous_balance.amount(),
        balance_amount: invoice.balance_amount.amount(),
        total_amount: invoice.total_amount.amount(),
        payment_month: invoice.payment_month.clone(),
        previous_invoice_id: invoice.previous_invoice_id.map(Into::into),
        created_at: invoice.created_at,
        corrected_at: invoice.corrected_at,
    }
}

fn row_to_invoice(row: InvoiceRow) -> Result<Invoice, PortError> {
    let currency = parse_currency(&row.currency)?;
    let due_number_source = DueNumberSource::parse(&row.due_number_source).ok_or_else(|| {
        PortError::transformation(format!("unknown due number source '{}'", row.due_number_source))
    })?;
    let phase = BillingPhase::parse(&row.phase)
        .ok_or_else(|| PortError::transformation(format!("unknown billing phase '{}'", row.phase)))?;
    let due_number = u32::try_from(row.due_number)
        .map_err(|_| PortError::transformation(format!("invalid due number {}", row.due_number)))?;

    Ok(Invoice {
        id: InvoiceId::from_uuid(row.invoice_id),
        invoice_number: row.invoice_number,
        enrollment_id: EnrollmentId::from_uuid(row.enrollment_id),
        customer_id: CustomerId::from_uuid(row.customer_id),
        plan_id: PlanId::from_uuid(row.plan_id),
        due_number,
        due_number_source,
        invoice_date: row.invoice_date,
        phase,
        due_amount: money(row.due_amount, currency),
        arrear_amount: money(row.arrear_amount, currency),
        received_amount: money(row.received_amount, currency),
        received_arrear_amount: money(row.received_arrear_amount, currency),
        previous_balance: money(row.previous_balance, currency),
        balance_amount: money(row.balance_amount, currency),
        total_amount: money(row.total_amount, currency),
        payment_month: row.payment_month,
        previous_invoice_id: row.previous_invoice_id.map(InvoiceId::from_uuid),
        created_at: row.created_at,
        corrected_at: row.corrected_at,
    })
}
