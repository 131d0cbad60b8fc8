//! Plan DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_billing::{Plan, ScheduleSource};

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub duration: u32,
    pub plan_type: String,
    pub schedule: String,
    /// Installment amount per due number; `None` where the schedule has a gap
    pub installments: Vec<Option<Decimal>>,
    pub created_at: DateTime<Utc>,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        let installments = (1..=plan.duration)
            .map(|due_number| {
                plan.due_amount_for_installment(due_number)
                    .ok()
                    .map(|money| money.amount())
            })
            .collect();

        Self {
            id: *plan.id.as_uuid(),
            name: plan.name,
            total_amount: plan.total_amount.amount(),
            currency: plan.total_amount.currency().code().to_string(),
            duration: plan.duration,
            plan_type: plan.plan_type.as_str().to_string(),
            schedule: schedule_kind(&plan.schedule).to_string(),
            installments,
            created_at: plan.created_at,
        }
    }
}

fn schedule_kind(schedule: &ScheduleSource) -> &'static str {
    match schedule {
        ScheduleSource::PerInstallment { .. } => "per_installment",
        ScheduleSource::FlatMonthly { .. } => "flat_monthly",
    }
}
