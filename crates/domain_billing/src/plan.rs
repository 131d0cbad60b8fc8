//! Chit plans and their installment schedules
//!
//! Plan records arrive in a loosely typed shape: `monthlyAmount` may be a
//! scalar or an array, and per-month rows may carry `installmentAmount`,
//! `payableAmount` and `dividend` in any combination. [`PlanDocument`] accepts
//! that shape and resolves it once into a [`Plan`] whose [`ScheduleSource`]
//! is fully typed, so installment lookups never branch on document shape.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, PlanId};

use crate::error::BillingError;

/// Installment cadence of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    #[default]
    Monthly,
    Weekly,
    Daily,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Weekly => "weekly",
            PlanType::Daily => "daily",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(PlanType::Monthly),
            "weekly" => Some(PlanType::Weekly),
            "daily" => Some(PlanType::Daily),
            _ => None,
        }
    }
}

/// One row of a per-installment schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Amount billed for this installment
    pub installment_amount: Option<Money>,
    /// Dividend distributed to members for this installment
    pub dividend: Option<Money>,
    /// Net amount payable after dividend (informational)
    pub payable_amount: Option<Money>,
}

impl ScheduleEntry {
    /// Creates an entry with only an installment amount
    pub fn installment(amount: Money) -> Self {
        Self {
            installment_amount: Some(amount),
            dividend: None,
            payable_amount: None,
        }
    }
}

/// Where installment amounts come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleSource {
    /// One entry per installment; `flat_amount` covers entries without an amount
    PerInstallment {
        entries: Vec<ScheduleEntry>,
        flat_amount: Option<Money>,
    },
    /// The same amount for every installment
    FlatMonthly {
        amount: Money,
    },
}

/// A billing schedule template that enrollments subscribe to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    /// Chit value
    pub total_amount: Money,
    /// Number of installments
    pub duration: u32,
    pub plan_type: PlanType,
    pub schedule: ScheduleSource,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Creates a plan, checking that the schedule covers exactly `duration` installments
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlan` when duration is zero, the schedule length differs
    /// from the duration, or amounts use a different currency than the total.
    pub fn new(
        name: impl Into<String>,
        total_amount: Money,
        duration: u32,
        plan_type: PlanType,
        schedule: ScheduleSource,
    ) -> Result<Self, BillingError> {
        let plan = Self {
            id: PlanId::new_v7(),
            name: name.into(),
            total_amount,
            duration,
            plan_type,
            schedule,
            created_at: Utc::now(),
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Returns the currency every amount of this plan is expressed in
    pub fn currency(&self) -> Currency {
        self.total_amount.currency()
    }

    /// Checks the plan invariants
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.duration == 0 {
            return Err(BillingError::InvalidPlan(format!(
                "plan '{}' must have at least one installment",
                self.name
            )));
        }

        let currency = self.currency();
        let mut amounts: Vec<Money> = Vec::new();
        match &self.schedule {
            ScheduleSource::PerInstallment { entries, flat_amount } => {
                if entries.len() != self.duration as usize {
                    return Err(BillingError::InvalidPlan(format!(
                        "plan '{}' has {} schedule entries for {} installments",
                        self.name,
                        entries.len(),
                        self.duration
                    )));
                }
                for entry in entries {
                    amounts.extend(entry.installment_amount);
                    amounts.extend(entry.dividend);
                    amounts.extend(entry.payable_amount);
                }
                amounts.extend(*flat_amount);
            }
            ScheduleSource::FlatMonthly { amount } => amounts.push(*amount),
        }

        if let Some(other) = amounts.iter().find(|m| m.currency() != currency) {
            return Err(BillingError::InvalidPlan(format!(
                "plan '{}' mixes {} with {}",
                self.name,
                currency,
                other.currency()
            )));
        }
        Ok(())
    }

    /// Returns the amount due for a 1-based installment number
    ///
    /// Resolution order: the schedule entry's installment amount, then the
    /// plan's flat amount, otherwise `PlanScheduleMissing`. Installment
    /// numbers beyond the schedule also report `PlanScheduleMissing`.
    pub fn due_amount_for_installment(&self, due_number: u32) -> Result<Money, BillingError> {
        let missing = || BillingError::PlanScheduleMissing {
            plan_id: self.id.to_string(),
            due_number,
        };
        if due_number == 0 || due_number > self.duration {
            return Err(missing());
        }

        match &self.schedule {
            ScheduleSource::PerInstallment { entries, flat_amount } => entries
                .get(due_number as usize - 1)
                .and_then(|entry| entry.installment_amount)
                .or(*flat_amount)
                .ok_or_else(missing),
            ScheduleSource::FlatMonthly { amount } => Ok(*amount),
        }
    }
}

/// `monthlyAmount` as stored: one figure for every month, or one per month
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MonthlyAmount {
    Flat(Decimal),
    PerInstallment(Vec<Decimal>),
}

/// A `monthlyData` row as stored
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDataRow {
    pub installment_amount: Option<Decimal>,
    pub payable_amount: Option<Decimal>,
    pub dividend: Option<Decimal>,
}

/// Plan record in its stored, loosely typed shape
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    pub name: String,
    pub total_amount: Decimal,
    pub duration: u32,
    #[serde(default)]
    pub plan_type: PlanType,
    #[serde(default)]
    pub currency: Currency,
    pub monthly_amount: Option<MonthlyAmount>,
    #[serde(default)]
    pub monthly_data: Vec<MonthlyDataRow>,
}

impl PlanDocument {
    /// Resolves the document into a typed plan
    ///
    /// `monthlyData` rows take precedence; a scalar `monthlyAmount` then acts
    /// as the fallback for rows without an installment amount. An array
    /// `monthlyAmount` without rows becomes the per-installment schedule.
    pub fn into_plan(self) -> Result<Plan, BillingError> {
        let currency = self.currency;
        let money = |value: Decimal| Money::new(value, currency);

        let schedule = match (self.monthly_data.is_empty(), self.monthly_amount) {
            (false, monthly_amount) => {
                let flat_amount = match monthly_amount {
                    Some(MonthlyAmount::Flat(value)) => Some(money(value)),
                    _ => None,
                };
                let entries = self
                    .monthly_data
                    .iter()
                    .map(|row| ScheduleEntry {
                        installment_amount: row.installment_amount.map(money),
                        dividend: row.dividend.map(money),
                        payable_amount: row.payable_amount.map(money),
                    })
                    .collect();
                ScheduleSource::PerInstallment { entries, flat_amount }
            }
            (true, Some(MonthlyAmount::PerInstallment(values))) => ScheduleSource::PerInstallment {
                entries: values.into_iter().map(|v| ScheduleEntry::installment(money(v))).collect(),
                flat_amount: None,
            },
            (true, Some(MonthlyAmount::Flat(value))) => ScheduleSource::FlatMonthly {
                amount: money(value),
            },
            (true, None) => {
                return Err(BillingError::InvalidPlan(format!(
                    "plan '{}' has neither monthlyData nor monthlyAmount",
                    self.name
                )));
            }
        };

        Plan::new(self.name, money(self.total_amount), self.duration, self.plan_type, schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inr(value: Decimal) -> Money {
        Money::new(value, Currency::INR)
    }

    #[test]
    fn test_flat_plan_resolves_every_installment() {
        let plan = Plan::new(
            "Gold 12",
            inr(dec!(12000)),
            12,
            PlanType::Monthly,
            ScheduleSource::FlatMonthly { amount: inr(dec!(1000)) },
        )
        .unwrap();

        assert_eq!(plan.due_amount_for_installment(1).unwrap(), inr(dec!(1000)));
        assert_eq!(plan.due_amount_for_installment(12).unwrap(), inr(dec!(1000)));
        assert!(matches!(
            plan.due_amount_for_installment(13),
            Err(BillingError::PlanScheduleMissing { due_number: 13, .. })
        ));
    }

    #[test]
    fn test_entry_without_amount_falls_back_to_flat() {
        let plan = Plan::new(
            "Mixed",
            inr(dec!(3000)),
            3,
            PlanType::Monthly,
            ScheduleSource::PerInstallment {
                entries: vec![
                    ScheduleEntry::installment(inr(dec!(1200))),
                    ScheduleEntry { installment_amount: None, dividend: Some(inr(dec!(50))), payable_amount: None },
                    ScheduleEntry::installment(inr(dec!(800))),
                ],
                flat_amount: Some(inr(dec!(1000))),
            },
        )
        .unwrap();

        assert_eq!(plan.due_amount_for_installment(1).unwrap(), inr(dec!(1200)));
        assert_eq!(plan.due_amount_for_installment(2).unwrap(), inr(dec!(1000)));
        assert_eq!(plan.due_amount_for_installment(3).unwrap(), inr(dec!(800)));
    }

    #[test]
    fn test_entry_without_amount_and_no_fallback_is_missing() {
        let plan = Plan::new(
            "Sparse",
            inr(dec!(2000)),
            2,
            PlanType::Monthly,
            ScheduleSource::PerInstallment {
                entries: vec![
                    ScheduleEntry::installment(inr(dec!(1000))),
                    ScheduleEntry { installment_amount: None, dividend: None, payable_amount: Some(inr(dec!(950))) },
                ],
                flat_amount: None,
            },
        )
        .unwrap();

        assert!(matches!(
            plan.due_amount_for_installment(2),
            Err(BillingError::PlanScheduleMissing { due_number: 2, .. })
        ));
    }

    #[test]
    fn test_schedule_length_must_match_duration() {
        let result = Plan::new(
            "Short",
            inr(dec!(3000)),
            3,
            PlanType::Monthly,
            ScheduleSource::PerInstallment {
                entries: vec![ScheduleEntry::installment(inr(dec!(1000)))],
                flat_amount: None,
            },
        );
        assert!(matches!(result, Err(BillingError::InvalidPlan(_))));
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let result = Plan::new(
            "Mixed currency",
            inr(dec!(1000)),
            1,
            PlanType::Monthly,
            ScheduleSource::FlatMonthly { amount: Money::new(dec!(1000), Currency::USD) },
        );
        assert!(matches!(result, Err(BillingError::InvalidPlan(_))));
    }

    #[test]
    fn test_document_with_scalar_monthly_amount() {
        let doc: PlanDocument = serde_json::from_str(
            r#"{"name":"Silver","totalAmount":"6000","duration":6,"monthlyAmount":"1000"}"#,
        )
        .unwrap();
        let plan = doc.into_plan().unwrap();
        assert_eq!(plan.schedule, ScheduleSource::FlatMonthly { amount: inr(dec!(1000)) });
    }

    #[test]
    fn test_document_with_array_monthly_amount() {
        let doc: PlanDocument = serde_json::from_str(
            r#"{"name":"Step","totalAmount":"3000","duration":3,"monthlyAmount":["1100","1000","900"]}"#,
        )
        .unwrap();
        let plan = doc.into_plan().unwrap();
        assert_eq!(plan.due_amount_for_installment(3).unwrap(), inr(dec!(900)));
    }

    #[test]
    fn test_document_with_monthly_data_rows() {
        let doc: PlanDocument = serde_json::from_str(
            r#"{
                "name": "Dividend",
                "totalAmount": "2000",
                "duration": 2,
                "planType": "monthly",
                "monthlyAmount": "1000",
                "monthlyData": [
                    {"installmentAmount": "1000", "dividend": "100", "payableAmount": "900"},
                    {"payableAmount": "950"}
                ]
            }"#,
        )
        .unwrap();
        let plan = doc.into_plan().unwrap();
        assert_eq!(plan.due_amount_for_installment(1).unwrap(), inr(dec!(1000)));
        // payableAmount is informational; the flat amount is the fallback
        assert_eq!(plan.due_amount_for_installment(2).unwrap(), inr(dec!(1000)));
    }

    #[test]
    fn test_document_without_schedule_rejected() {
        let doc: PlanDocument =
            serde_json::from_str(r#"{"name":"Empty","totalAmount":"1000","duration":1}"#).unwrap();
        assert!(matches!(doc.into_plan(), Err(BillingError::InvalidPlan(_))));
    }
}
