//! Billing repository implementation
//!
//! SQL for plans, enrollments and the per-enrollment invoice chain. Rows are
//! plain column mirrors; mapping to domain types happens in the adapter.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for chit plans, enrollments and invoices
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    /// Creates a new BillingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ========================================================================
    // Plans
    // ========================================================================

    /// Inserts a plan or replaces the stored one with the same id
    pub async fn upsert_plan(&self, plan: &PlanRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO plans (
                plan_id, name, total_amount, currency, duration, plan_type, schedule, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (plan_id) DO UPDATE SET
                name = EXCLUDED.name,
                total_amount = EXCLUDED.total_amount,
                currency = EXCLUDED.currency,
                duration = EXCLUDED.duration,
                plan_type = EXCLUDED.plan_type,
                schedule = EXCLUDED.schedule
            "#,
        )
        .bind(plan.plan_id)
        .bind(&plan.name)
        .bind(plan.total_amount)
        .bind(&plan.currency)
        .bind(plan.duration)
        .bind(&plan.plan_type)
        .bind(&plan.schedule)
        .bind(plan.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Result<Option<PlanRow>, DatabaseError> {
        let row = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE plan_id = $1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_plans(&self) -> Result<Vec<PlanRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ========================================================================
    // Enrollments
    // ========================================================================

    /// Inserts an enrollment
    ///
    /// Unique violations on member number or (customer, plan) surface as
    /// `DuplicateEntry`.
    pub async fn insert_enrollment(&self, enrollment: &EnrollmentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (
                enrollment_id, customer_id, plan_id, member_number, start_date, status,
                currency, total_paid, total_due, current_arrear, arrear_last_updated, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(enrollment.enrollment_id)
        .bind(enrollment.customer_id)
        .bind(enrollment.plan_id)
        .bind(&enrollment.member_number)
        .bind(enrollment.start_date)
        .bind(&enrollment.status)
        .bind(&enrollment.currency)
        .bind(enrollment.total_paid)
        .bind(enrollment.total_due)
        .bind(enrollment.current_arrear)
        .bind(enrollment.arrear_last_updated)
        .bind(enrollment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_enrollment(&self, enrollment_id: Uuid) -> Result<Option<EnrollmentRow>, DatabaseError> {
        let row = sqlx::query_as::<_, EnrollmentRow>("SELECT * FROM enrollments WHERE enrollment_id = $1")
            .bind(enrollment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_enrollment(
        &self,
        customer_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<EnrollmentRow>, DatabaseError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT * FROM enrollments WHERE customer_id = $1 AND plan_id = $2",
        )
        .bind(customer_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Lists enrollments; `None` filters match everything
    pub async fn list_enrollments(
        &self,
        customer_id: Option<Uuid>,
        plan_id: Option<Uuid>,
        status: Option<&str>,
    ) -> Result<Vec<EnrollmentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT * FROM enrollments
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::uuid IS NULL OR plan_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at, enrollment_id
            "#,
        )
        .bind(customer_id)
        .bind(plan_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_arrear(
        &self,
        enrollment_id: Uuid,
        arrear: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE enrollments SET current_arrear = $2, arrear_last_updated = $3 WHERE enrollment_id = $1",
        )
        .bind(enrollment_id)
        .bind(arrear)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Enrollment", enrollment_id));
        }
        Ok(())
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<InvoiceRow>, DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>("SELECT * FROM invoices WHERE invoice_id = $1")
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Most recent invoice dated strictly before `date`
    pub async fn latest_invoice_before(
        &self,
        enrollment_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<InvoiceRow>, DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT * FROM invoices
            WHERE enrollment_id = $1 AND invoice_date < $2
            ORDER BY invoice_date DESC
            LIMIT 1
            "#,
        )
        .bind(enrollment_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn latest_invoice(&self, enrollment_id: Uuid) -> Result<Option<InvoiceRow>, DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT * FROM invoices
            WHERE enrollment_id = $1
            ORDER BY invoice_date DESC
            LIMIT 1
            "#,
        )
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_invoices(&self, enrollment_id: Uuid) -> Result<Vec<InvoiceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            "SELECT * FROM invoices WHERE enrollment_id = $1 ORDER BY invoice_date",
        )
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Next value of the global invoice number sequence
    pub async fn next_invoice_number(&self) -> Result<i64, DatabaseError> {
        let value = sqlx::query_scalar::<_, i64>("SELECT nextval('invoice_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(value)
    }

    /// Inserts an invoice and bumps the enrollment's running totals in one transaction
    ///
    /// The transaction holds an advisory lock keyed on the enrollment, then
    /// rejects the insert with `ChainConflict` when the invoice's recorded
    /// predecessor is no longer the latest invoice dated before it, or when an
    /// invoice dated on or after it already exists.
    pub async fn insert_invoice(&self, invoice: &InvoiceRow) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        lock_enrollment(&mut tx, invoice.enrollment_id).await?;

        let predecessor = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT invoice_id FROM invoices
            WHERE enrollment_id = $1 AND invoice_date < $2
            ORDER BY invoice_date DESC
            LIMIT 1
            "#,
        )
        .bind(invoice.enrollment_id)
        .bind(invoice.invoice_date)
        .fetch_optional(&mut *tx)
        .await?;

        if predecessor != invoice.previous_invoice_id {
            return Err(DatabaseError::ChainConflict(format!(
                "invoice chain of enrollment {} changed",
                invoice.enrollment_id
            )));
        }

        let later_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM invoices WHERE enrollment_id = $1 AND invoice_date >= $2)",
        )
        .bind(invoice.enrollment_id)
        .bind(invoice.invoice_date)
        .fetch_one(&mut *tx)
        .await?;

        if later_exists {
            return Err(DatabaseError::ChainConflict(format!(
                "enrollment {} already has an invoice dated on or after {}",
                invoice.enrollment_id, invoice.invoice_date
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, enrollment_id, customer_id, plan_id,
                due_number, due_number_source, invoice_date, phase, currency,
                due_amount, arrear_amount, received_amount, received_arrear_amount,
                previous_balance, balance_amount, total_amount, payment_month,
                previous_invoice_id, created_at, corrected_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            "#,
        )
        .bind(invoice.invoice_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.enrollment_id)
        .bind(invoice.customer_id)
        .bind(invoice.plan_id)
        .bind(invoice.due_number)
        .bind(&invoice.due_number_source)
        .bind(invoice.invoice_date)
        .bind(&invoice.phase)
        .bind(&invoice.currency)
        .bind(invoice.due_amount)
        .bind(invoice.arrear_amount)
        .bind(invoice.received_amount)
        .bind(invoice.received_arrear_amount)
        .bind(invoice.previous_balance)
        .bind(invoice.balance_amount)
        .bind(invoice.total_amount)
        .bind(&invoice.payment_month)
        .bind(invoice.previous_invoice_id)
        .bind(invoice.created_at)
        .bind(invoice.corrected_at)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r#"
            UPDATE enrollments
            SET total_paid = total_paid + $2, total_due = total_due + $3
            WHERE enrollment_id = $1
            "#,
        )
        .bind(invoice.enrollment_id)
        .bind(invoice.received_amount + invoice.received_arrear_amount)
        .bind(invoice.due_amount)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Enrollment", invoice.enrollment_id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Stores corrected amounts and shifts the enrollment's `total_paid` in one transaction
    pub async fn update_correction(&self, invoice: &InvoiceRow, paid_delta: Decimal) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        lock_enrollment(&mut tx, invoice.enrollment_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE invoices
            SET received_amount = $2, balance_amount = $3, corrected_at = $4
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice.invoice_id)
        .bind(invoice.received_amount)
        .bind(invoice.balance_amount)
        .bind(invoice.corrected_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Invoice", invoice.invoice_id));
        }

        sqlx::query("UPDATE enrollments SET total_paid = total_paid + $2 WHERE enrollment_id = $1")
            .bind(invoice.enrollment_id)
            .bind(paid_delta)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Serializes writers on one enrollment until the transaction ends
async fn lock_enrollment(tx: &mut Transaction<'_, Postgres>, enrollment_id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
        .bind(enrollment_id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Database row for plans
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRow {
    pub plan_id: Uuid,
    pub name: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub duration: i32,
    pub plan_type: String,
    /// Typed schedule serialized as JSON
    pub schedule: Json<Value>,
    pub created_at: DateTime<Utc>,
}

/// Database row for enrollments
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentRow {
    pub enrollment_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub member_number: String,
    pub start_date: NaiveDate,
    pub status: String,
    pub currency: String,
    pub total_paid: Decimal,
    pub total_due: Decimal,
    pub current_arrear: Decimal,
    pub arrear_last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database row for invoices
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub enrollment_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub due_number: i32,
    pub due_number_source: String,
    pub invoice_date: NaiveDate,
    pub phase: String,
    pub currency: String,
    pub due_amount: Decimal,
    pub arrear_amount: Decimal,
    pub received_amount: Decimal,
    pub received_arrear_amount: Decimal,
    pub previous_balance: Decimal,
    pub balance_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_month: String,
    pub previous_invoice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub corrected_at: Option<DateTime<Utc>>,
}
