//! Enrollment handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{EnrollmentQuery, EnrollmentStatus};

use crate::dto::enrollments::{CreateEnrollmentRequest, EnrollmentListQuery, EnrollmentResponse};
use crate::dto::invoices::InvoiceResponse;
use crate::{error::ApiError, AppState};

/// Enrolls a customer in a plan
pub async fn create_enrollment(
    State(state): State<AppState>,
    Json(request): Json<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    request.validate()?;
    let enrollment = state.invoices.enroll(request.into()).await?;
    Ok((StatusCode::CREATED, Json(enrollment.into())))
}

/// Lists enrollments, optionally filtered by customer, plan or status
pub async fn list_enrollments(
    State(state): State<AppState>,
    Query(params): Query<EnrollmentListQuery>,
) -> Result<Json<Vec<EnrollmentResponse>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|value| {
            EnrollmentStatus::parse(value)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown enrollment status: {}", value)))
        })
        .transpose()?;

    let query = EnrollmentQuery {
        customer_id: params.customer_id.map(Into::into),
        plan_id: params.plan_id.map(Into::into),
        status,
    };

    let enrollments = state.invoices.list_enrollments(query).await?;
    Ok(Json(enrollments.into_iter().map(Into::into).collect()))
}

/// Gets an enrollment by ID
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = state.invoices.get_enrollment(id.into()).await?;
    Ok(Json(enrollment.into()))
}

/// Lists an enrollment's invoices in date order
pub async fn list_invoices(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let invoices = state.invoices.invoice_history(id.into()).await?;
    Ok(Json(invoices.into_iter().map(Into::into).collect()))
}
