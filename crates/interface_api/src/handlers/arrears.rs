//! Arrear refresh handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::dto::arrears::{RefreshParams, RefreshResponse, SeedResponse};
use crate::{error::ApiError, AppState};

/// Runs the periodic arrear refresh
///
/// Without `as_of` the run uses today in the configured timezone.
pub async fn refresh_arrears(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let as_of = params
        .as_of
        .unwrap_or_else(|| state.invoices.config().timezone.today());
    let report = state.refresh.refresh(as_of, params.force).await?;
    Ok(Json(RefreshResponse::new(as_of, params.force, report)))
}

/// Seeds the cached arrear of invoice-less enrollments with their first installment
pub async fn seed_arrears(
    State(state): State<AppState>,
) -> Result<Json<SeedResponse>, ApiError> {
    let report = state.refresh.seed_initial_arrears().await?;
    Ok(Json(report.into()))
}
