//! Billing Domain Ports
//!
//! The `BillingPort` trait is everything invoice assembly, the arrear refresh
//! and seeding need from storage. Two adapters implement it:
//!
//! - **PostgreSQL Adapter**: `infra_db::PostgresBillingAdapter`
//! - **Mock Adapter**: in-memory, behind the `mock` feature
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::{BillingConfig, InvoiceService};
//! use std::sync::Arc;
//!
//! let port: Arc<dyn BillingPort> = Arc::new(PostgresBillingAdapter::new(pool));
//! let service = InvoiceService::new(port, BillingConfig::default());
//! ```
//!
//! # Write rules
//!
//! `record_invoice` is the only way an invoice enters storage. Adapters must
//! insert the invoice and bump the enrollment's running totals atomically,
//! and must reject the write with `PortError::Conflict` when the invoice's
//! `previous_invoice_id` is no longer the latest invoice dated before it, or
//! when the enrollment already has an invoice dated on or after it. Invoice
//! dates are therefore strictly increasing per enrollment.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use core_kernel::{
    CustomerId, DomainPort, EnrollmentId, HealthCheckable, InvoiceId, Money, PlanId, PortError,
};

use crate::enrollment::{Enrollment, EnrollmentStatus};
use crate::invoice::Invoice;
use crate::plan::Plan;

/// Query parameters for listing enrollments
#[derive(Debug, Clone, Default)]
pub struct EnrollmentQuery {
    /// Filter by customer
    pub customer_id: Option<CustomerId>,
    /// Filter by plan
    pub plan_id: Option<PlanId>,
    /// Filter by status
    pub status: Option<EnrollmentStatus>,
}

impl EnrollmentQuery {
    /// Creates a query for active enrollments
    pub fn active() -> Self {
        Self {
            status: Some(EnrollmentStatus::Active),
            ..Default::default()
        }
    }

    /// Creates a query for one customer's enrollments
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    /// Returns true if the enrollment satisfies every set filter
    pub fn matches(&self, enrollment: &Enrollment) -> bool {
        self.customer_id.map_or(true, |id| enrollment.customer_id == id)
            && self.plan_id.map_or(true, |id| enrollment.plan_id == id)
            && self.status.map_or(true, |status| enrollment.status == status)
    }
}

/// Port trait for billing storage
#[async_trait]
pub trait BillingPort: DomainPort + HealthCheckable {
    // ========================================================================
    // Plans
    // ========================================================================

    /// Stores a plan, replacing any plan with the same id
    async fn save_plan(&self, plan: &Plan) -> Result<(), PortError>;

    /// Retrieves a plan by id
    async fn get_plan(&self, id: PlanId) -> Result<Plan, PortError>;

    /// Lists all plans
    async fn list_plans(&self) -> Result<Vec<Plan>, PortError>;

    // ========================================================================
    // Enrollments
    // ========================================================================

    /// Stores a new enrollment
    ///
    /// Fails with `Conflict` when the member number is taken or the customer
    /// is already enrolled in the plan.
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), PortError>;

    /// Retrieves an enrollment by id
    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, PortError>;

    /// Finds the enrollment of a customer in a plan
    async fn find_enrollment(
        &self,
        customer_id: CustomerId,
        plan_id: PlanId,
    ) -> Result<Option<Enrollment>, PortError>;

    /// Lists enrollments matching a query, oldest first
    async fn list_enrollments(&self, query: EnrollmentQuery) -> Result<Vec<Enrollment>, PortError>;

    /// Overwrites the cached arrear of an enrollment
    async fn update_enrollment_arrear(
        &self,
        id: EnrollmentId,
        arrear: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<(), PortError>;

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Retrieves an invoice by id
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    /// The most recent invoice of the enrollment dated strictly before `date`
    async fn latest_invoice_before(
        &self,
        enrollment_id: EnrollmentId,
        date: NaiveDate,
    ) -> Result<Option<Invoice>, PortError>;

    /// The most recent invoice of the enrollment
    async fn latest_invoice(&self, enrollment_id: EnrollmentId) -> Result<Option<Invoice>, PortError>;

    /// All invoices of the enrollment in ascending date order
    async fn list_invoices(&self, enrollment_id: EnrollmentId) -> Result<Vec<Invoice>, PortError>;

    /// Allocates the next value of the global invoice number sequence
    async fn next_invoice_number(&self) -> Result<u64, PortError>;

    /// Inserts an invoice and adds it to the enrollment's running totals
    async fn record_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    /// Stores a corrected invoice and shifts the enrollment's `total_paid`
    /// by `paid_delta`
    async fn record_correction(&self, invoice: &Invoice, paid_delta: Money) -> Result<(), PortError>;
}

/// Extension trait for BillingPort with convenience methods
#[async_trait]
pub trait BillingPortExt: BillingPort {
    /// Lists active enrollments
    async fn list_active_enrollments(&self) -> Result<Vec<Enrollment>, PortError> {
        self.list_enrollments(EnrollmentQuery::active()).await
    }

    /// Returns true if the enrollment has at least one invoice
    async fn has_invoices(&self, enrollment_id: EnrollmentId) -> Result<bool, PortError> {
        Ok(self.latest_invoice(enrollment_id).await?.is_some())
    }
}

// Blanket implementation for all BillingPort implementors
impl<T: BillingPort + ?Sized> BillingPortExt for T {}

/// Mock implementation of BillingPort for testing
///
/// Stores everything in memory behind a single lock so each write is
/// atomic. Writes can be made to fail to exercise error paths.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct MockState {
        plans: HashMap<PlanId, Plan>,
        enrollments: HashMap<EnrollmentId, Enrollment>,
        invoices: HashMap<InvoiceId, Invoice>,
    }

    impl MockState {
        fn invoices_of(&self, enrollment_id: EnrollmentId) -> Vec<&Invoice> {
            let mut invoices: Vec<_> = self
                .invoices
                .values()
                .filter(|i| i.enrollment_id == enrollment_id)
                .collect();
            invoices.sort_by_key(|i| i.invoice_date);
            invoices
        }

        fn latest_before(&self, enrollment_id: EnrollmentId, date: NaiveDate) -> Option<&Invoice> {
            self.invoices_of(enrollment_id)
                .into_iter()
                .filter(|i| i.invoice_date < date)
                .last()
        }
    }

    /// In-memory mock implementation of BillingPort
    #[derive(Debug, Default)]
    pub struct MockBillingPort {
        state: Arc<RwLock<MockState>>,
        sequence: AtomicU64,
        fail_writes: AtomicBool,
    }

    impl MockBillingPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with plans for testing
        pub async fn with_plans(plans: Vec<Plan>) -> Self {
            let port = Self::new();
            {
                let mut state = port.state.write().await;
                for plan in plans {
                    state.plans.insert(plan.id, plan);
                }
            }
            port
        }

        /// Makes every subsequent write fail with a connection error
        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Number of stored invoices across all enrollments
        pub async fn invoice_count(&self) -> usize {
            self.state.read().await.invoices.len()
        }

        fn check_writable(&self) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock store is rejecting writes"));
            }
            Ok(())
        }
    }

    impl DomainPort for MockBillingPort {}

    #[async_trait]
    impl HealthCheckable for MockBillingPort {
        async fn health_check(&self) -> core_kernel::HealthCheckResult {
            core_kernel::HealthCheckResult {
                adapter_id: "mock-billing-port".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl BillingPort for MockBillingPort {
        async fn save_plan(&self, plan: &Plan) -> Result<(), PortError> {
            self.check_writable()?;
            self.state.write().await.plans.insert(plan.id, plan.clone());
            Ok(())
        }

        async fn get_plan(&self, id: PlanId) -> Result<Plan, PortError> {
            self.state
                .read()
                .await
                .plans
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Plan", id))
        }

        async fn list_plans(&self) -> Result<Vec<Plan>, PortError> {
            let state = self.state.read().await;
            let mut plans: Vec<_> = state.plans.values().cloned().collect();
            plans.sort_by_key(|p| p.created_at);
            Ok(plans)
        }

        async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), PortError> {
            self.check_writable()?;
            let mut state = self.state.write().await;

            if state
                .enrollments
                .values()
                .any(|e| e.member_number == enrollment.member_number)
            {
                return Err(PortError::conflict(format!(
                    "member number {} already assigned",
                    enrollment.member_number
                )));
            }
            if state
                .enrollments
                .values()
                .any(|e| e.customer_id == enrollment.customer_id && e.plan_id == enrollment.plan_id)
            {
                return Err(PortError::conflict(format!(
                    "customer {} already enrolled in plan {}",
                    enrollment.customer_id, enrollment.plan_id
                )));
            }

            state.enrollments.insert(enrollment.id, enrollment.clone());
            Ok(())
        }

        async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, PortError> {
            self.state
                .read()
                .await
                .enrollments
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Enrollment", id))
        }

        async fn find_enrollment(
            &self,
            customer_id: CustomerId,
            plan_id: PlanId,
        ) -> Result<Option<Enrollment>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .enrollments
                .values()
                .find(|e| e.customer_id == customer_id && e.plan_id == plan_id)
                .cloned())
        }

        async fn list_enrollments(&self, query: EnrollmentQuery) -> Result<Vec<Enrollment>, PortError> {
            let state = self.state.read().await;
            let mut results: Vec<_> = state
                .enrollments
                .values()
                .filter(|e| query.matches(e))
                .cloned()
                .collect();
            results.sort_by_key(|e| (e.created_at, e.id));
            Ok(results)
        }

        async fn update_enrollment_arrear(
            &self,
            id: EnrollmentId,
            arrear: Money,
            updated_at: DateTime<Utc>,
        ) -> Result<(), PortError> {
            self.check_writable()?;
            let mut state = self.state.write().await;
            let enrollment = state
                .enrollments
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Enrollment", id))?;
            enrollment.current_arrear = arrear;
            enrollment.arrear_last_updated = Some(updated_at);
            Ok(())
        }

        async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.state
                .read()
                .await
                .invoices
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn latest_invoice_before(
            &self,
            enrollment_id: EnrollmentId,
            date: NaiveDate,
        ) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .latest_before(enrollment_id, date)
                .cloned())
        }

        async fn latest_invoice(&self, enrollment_id: EnrollmentId) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .invoices_of(enrollment_id)
                .last()
                .map(|i| (*i).clone()))
        }

        async fn list_invoices(&self, enrollment_id: EnrollmentId) -> Result<Vec<Invoice>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .invoices_of(enrollment_id)
                .into_iter()
                .cloned()
                .collect())
        }

        async fn next_invoice_number(&self) -> Result<u64, PortError> {
            Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn record_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
            self.check_writable()?;
            let mut state = self.state.write().await;

            if !state.enrollments.contains_key(&invoice.enrollment_id) {
                return Err(PortError::not_found("Enrollment", invoice.enrollment_id));
            }

            let expected = state
                .latest_before(invoice.enrollment_id, invoice.invoice_date)
                .map(|i| i.id);
            if expected != invoice.previous_invoice_id {
                return Err(PortError::conflict(format!(
                    "invoice chain of enrollment {} changed",
                    invoice.enrollment_id
                )));
            }
            if state
                .invoices_of(invoice.enrollment_id)
                .iter()
                .any(|i| i.invoice_date >= invoice.invoice_date)
            {
                return Err(PortError::conflict(format!(
                    "enrollment {} already has an invoice dated on or after {}",
                    invoice.enrollment_id, invoice.invoice_date
                )));
            }

            let enrollment = state
                .enrollments
                .get_mut(&invoice.enrollment_id)
                .ok_or_else(|| PortError::not_found("Enrollment", invoice.enrollment_id))?;
            let total_paid = enrollment
                .total_paid
                .checked_add(&invoice.amount_paid())
                .map_err(|e| PortError::validation(e.to_string()))?;
            let total_due = enrollment
                .total_due
                .checked_add(&invoice.due_amount)
                .map_err(|e| PortError::validation(e.to_string()))?;
            enrollment.total_paid = total_paid;
            enrollment.total_due = total_due;

            state.invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn record_correction(&self, invoice: &Invoice, paid_delta: Money) -> Result<(), PortError> {
            self.check_writable()?;
            let mut state = self.state.write().await;

            if !state.invoices.contains_key(&invoice.id) {
                return Err(PortError::not_found("Invoice", invoice.id));
            }
            let enrollment = state
                .enrollments
                .get_mut(&invoice.enrollment_id)
                .ok_or_else(|| PortError::not_found("Enrollment", invoice.enrollment_id))?;
            enrollment.total_paid = enrollment
                .total_paid
                .checked_add(&paid_delta)
                .map_err(|e| PortError::validation(e.to_string()))?;

            state.invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }
    }
}
