//! Plan handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use domain_billing::PlanDocument;

use crate::dto::plans::PlanResponse;
use crate::{error::ApiError, AppState};

/// Registers a plan from its stored document shape
pub async fn create_plan(
    State(state): State<AppState>,
    Json(document): Json<PlanDocument>,
) -> Result<(StatusCode, Json<PlanResponse>), ApiError> {
    let plan = document.into_plan()?;
    let plan = state.invoices.register_plan(plan).await?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// Lists plans
pub async fn list_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlanResponse>>, ApiError> {
    let plans = state.invoices.list_plans().await?;
    Ok(Json(plans.into_iter().map(Into::into).collect()))
}

/// Gets a plan by ID
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanResponse>, ApiError> {
    let plan = state.invoices.get_plan(id.into()).await?;
    Ok(Json(plan.into()))
}
