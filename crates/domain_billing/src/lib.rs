//! Billing Domain - Chit Fund Invoices, Arrears and Balances
//!
//! This crate turns a customer's enrollment in a chit fund plan into a chain
//! of invoices. Each invoice records which installment it covers, what is
//! carried over from earlier months, and what is still outstanding.
//!
//! # Billing Calendar
//!
//! Two days of the month drive every rule:
//! - **Cutoff (20th)**: invoices dated after it bill the following month
//! - **Reset (21st)**: the outstanding balance rolls into the arrear and the
//!   balance is re-billed as installment plus arrear
//!
//! # Calculators
//!
//! - [`due_number`]: installment number from enrollment start and invoice date
//! - [`plan`]: installment amount for a due number
//! - [`arrear`]: arrear carried from the prior invoice
//! - [`balance`]: outstanding balance under the reset or carry formula
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{InvoiceService, CreateInvoiceRequest, BillingConfig};
//!
//! let service = InvoiceService::new(port, BillingConfig::default());
//! let invoice = service.create_invoice(CreateInvoiceRequest {
//!     customer_id,
//!     plan_id,
//!     invoice_date: Some(date),
//!     received_amount: Some(dec!(1000)),
//!     ..Default::default()
//! }).await?;
//! ```

pub mod arrear;
pub mod balance;
pub mod config;
pub mod due_number;
pub mod enrollment;
pub mod error;
pub mod invoice;
pub mod locks;
pub mod plan;
pub mod ports;
pub mod refresh;
pub mod service;

pub use arrear::{calculate_arrear, carried_arrear, ArrearResolution};
pub use balance::{calculate_balance, opening_balance, BalanceInputs, BalancePolicy};
pub use config::BillingConfig;
pub use due_number::{calculate_due_number, validate_manual_due_number};
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use error::BillingError;
pub use invoice::{DueNumberSource, Invoice, InvoiceCorrection, InvoiceDraft};
pub use locks::{EnrollmentGuard, EnrollmentLocks};
pub use plan::{MonthlyAmount, MonthlyDataRow, Plan, PlanDocument, PlanType, ScheduleEntry, ScheduleSource};
pub use ports::{BillingPort, BillingPortExt, EnrollmentQuery};
pub use refresh::{
    ArrearRefreshService, FailedEntry, RefreshEntry, RefreshReport, RefreshState, SeedReport, SkippedEntry,
};
pub use service::{CreateInvoiceRequest, EnrollRequest, InvoiceService};
