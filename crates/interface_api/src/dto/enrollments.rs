//! Enrollment DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{EnrollRequest, Enrollment};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEnrollmentRequest {
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    #[validate(length(min = 1, max = 32))]
    pub member_number: String,
    pub start_date: NaiveDate,
}

impl From<CreateEnrollmentRequest> for EnrollRequest {
    fn from(request: CreateEnrollmentRequest) -> Self {
        EnrollRequest {
            customer_id: request.customer_id.into(),
            plan_id: request.plan_id.into(),
            member_number: request.member_number,
            start_date: request.start_date,
        }
    }
}

/// Query string of the enrollment listing
#[derive(Debug, Default, Deserialize)]
pub struct EnrollmentListQuery {
    pub customer_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
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

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: *enrollment.id.as_uuid(),
            customer_id: *enrollment.customer_id.as_uuid(),
            plan_id: *enrollment.plan_id.as_uuid(),
            member_number: enrollment.member_number,
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
}
