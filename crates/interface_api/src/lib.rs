//! HTTP API Layer
//!
//! This crate provides the REST API for the chit fund billing system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for plans, enrollments, invoices and arrears
//! - **Middleware**: Tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(port, config)?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::CoreError;
use domain_billing::{ArrearRefreshService, BillingPort, EnrollmentLocks, InvoiceService};

use crate::config::ApiConfig;
use crate::handlers::{arrears, enrollments, health, invoices, plans};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub port: Arc<dyn BillingPort>,
    pub invoices: Arc<InvoiceService>,
    pub refresh: Arc<ArrearRefreshService>,
    pub config: ApiConfig,
}

impl AppState {
    /// Builds the services over a billing port
    ///
    /// Invoice creation and the arrear refresh share one lock registry so a
    /// refresh never interleaves with an invoice write for the same enrollment.
    pub fn new(port: Arc<dyn BillingPort>, config: ApiConfig) -> Result<Self, CoreError> {
        let billing = config.billing_config()?;
        let locks = EnrollmentLocks::new();
        let invoices = InvoiceService::with_locks(port.clone(), billing, locks.clone());
        let refresh = ArrearRefreshService::new(port.clone(), locks);

        Ok(Self {
            port,
            invoices: Arc::new(invoices),
            refresh: Arc::new(refresh),
            config,
        })
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `port` - Billing persistence port
/// * `config` - API configuration
///
/// # Errors
///
/// Returns an error if the billing settings in `config` are invalid
pub fn create_router(port: Arc<dyn BillingPort>, config: ApiConfig) -> Result<Router, CoreError> {
    let state = AppState::new(port, config)?;
    Ok(router_with_state(state))
}

/// Creates the router over prepared state
pub fn router_with_state(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let plan_routes = Router::new()
        .route("/", post(plans::create_plan).get(plans::list_plans))
        .route("/:id", get(plans::get_plan));

    let enrollment_routes = Router::new()
        .route("/", post(enrollments::create_enrollment).get(enrollments::list_enrollments))
        .route("/:id", get(enrollments::get_enrollment))
        .route("/:id/invoices", get(enrollments::list_invoices));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice))
        .route("/preview", post(invoices::preview_invoice))
        .route("/:id", get(invoices::get_invoice))
        .route("/:id/correction", patch(invoices::correct_invoice));

    let arrear_routes = Router::new()
        .route("/refresh", post(arrears::refresh_arrears))
        .route("/seed", post(arrears::seed_arrears));

    let api_routes = Router::new()
        .nest("/plans", plan_routes)
        .nest("/enrollments", enrollment_routes)
        .nest("/invoices", invoice_routes)
        .nest("/arrears", arrear_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
