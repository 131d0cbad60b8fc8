//! Invoice handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dto::invoices::{CorrectionRequest, InvoiceFigures, InvoiceRequest, InvoiceResponse};
use crate::{error::ApiError, AppState};

/// Creates the next invoice of an enrollment
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<InvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    let invoice = state.invoices.create_invoice(request.into()).await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// Computes an invoice without persisting it
pub async fn preview_invoice(
    State(state): State<AppState>,
    Json(request): Json<InvoiceRequest>,
) -> Result<Json<InvoiceFigures>, ApiError> {
    let draft = state.invoices.preview_invoice(request.into()).await?;
    Ok(Json(draft.into()))
}

/// Gets an invoice by ID
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.invoices.get_invoice(id.into()).await?;
    Ok(Json(invoice.into()))
}

/// Overwrites received and/or balance amounts of an issued invoice
pub async fn correct_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CorrectionRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.invoices.correct_invoice(id.into(), request.into()).await?;
    Ok(Json(invoice.into()))
}
