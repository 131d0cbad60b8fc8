//! Invoice DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_billing::{CreateInvoiceRequest, Invoice, InvoiceCorrection, InvoiceDraft};

/// Body of invoice creation and preview
#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub invoice_date: Option<NaiveDate>,
    pub received_amount: Option<Decimal>,
    pub received_arrear_amount: Option<Decimal>,
    pub manual_due_number: Option<i64>,
}

impl From<InvoiceRequest> for CreateInvoiceRequest {
    fn from(request: InvoiceRequest) -> Self {
        CreateInvoiceRequest {
            customer_id: request.customer_id.into(),
            plan_id: request.plan_id.into(),
            invoice_date: request.invoice_date,
            received_amount: request.received_amount,
            received_arrear_amount: request.received_arrear_amount,
            manual_due_number: request.manual_due_number,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub received_amount: Option<Decimal>,
    pub balance_amount: Option<Decimal>,
}

impl From<CorrectionRequest> for InvoiceCorrection {
    fn from(request: CorrectionRequest) -> Self {
        InvoiceCorrection {
            received_amount: request.received_amount,
            balance_amount: request.balance_amount,
        }
    }
}

/// Computed figures shared by issued invoices and previews
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceFigures {
    pub enrollment_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub due_number: u32,
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
}

impl From<InvoiceDraft> for InvoiceFigures {
    fn from(draft: InvoiceDraft) -> Self {
        Self {
            enrollment_id: *draft.enrollment_id.as_uuid(),
            customer_id: *draft.customer_id.as_uuid(),
            plan_id: *draft.plan_id.as_uuid(),
            due_number: draft.due_number,
            due_number_source: draft.due_number_source.as_str().to_string(),
            invoice_date: draft.invoice_date,
            phase: draft.phase.as_str().to_string(),
            currency: draft.due_amount.currency().code().to_string(),
            due_amount: draft.due_amount.amount(),
            arrear_amount: draft.arrear_amount.amount(),
            received_amount: draft.received_amount.amount(),
            received_arrear_amount: draft.received_arrear_amount.amount(),
            previous_balance: draft.previous_balance.amount(),
            balance_amount: draft.balance_amount.amount(),
            total_amount: draft.total_amount.amount(),
            payment_month: draft.payment_month,
            previous_invoice_id: draft.previous_invoice_id.map(|id| *id.as_uuid()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    #[serde(flatten)]
    pub figures: InvoiceFigures,
    pub created_at: DateTime<Utc>,
    pub corrected_at: Option<DateTime<Utc>>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: *invoice.id.as_uuid(),
            invoice_number: invoice.invoice_number,
            figures: InvoiceFigures {
                enrollment_id: *invoice.enrollment_id.as_uuid(),
                customer_id: *invoice.customer_id.as_uuid(),
                plan_id: *invoice.plan_id.as_uuid(),
                due_number: invoice.due_number,
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
                payment_month: invoice.payment_month,
                previous_invoice_id: invoice.previous_invoice_id.map(|id| *id.as_uuid()),
            },
            created_at: invoice.created_at,
            corrected_at: invoice.corrected_at,
        }
    }
}
