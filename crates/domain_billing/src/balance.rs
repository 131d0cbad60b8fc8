//! Balance calculation
//!
//! On the reset day the invoice re-bills everything owed:
//! `balance = (due + arrear) - received`. On any other day the balance only
//! moves by payments: `balance = previous_balance - received - received_arrear`.

use serde::{Deserialize, Serialize};

use core_kernel::{BillingPhase, Money};

use crate::error::BillingError;
use crate::invoice::Invoice;

/// Whether a balance may go below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Overpayment is kept as a negative (credit) balance
    AllowNegative,
    /// Balances are floored at zero
    FloorAtZero,
}

/// Figures feeding the balance formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceInputs {
    pub due_amount: Money,
    pub arrear_amount: Money,
    pub received_amount: Money,
    /// Only subtracted by the carry formula
    pub received_arrear_amount: Money,
    pub previous_balance: Money,
}

/// Computes the outstanding balance of an invoice
///
/// # Errors
///
/// `Money` when the inputs are in different currencies.
pub fn calculate_balance(
    inputs: &BalanceInputs,
    phase: BillingPhase,
    policy: BalancePolicy,
) -> Result<Money, BillingError> {
    let balance = match phase {
        BillingPhase::Reset => inputs
            .due_amount
            .checked_add(&inputs.arrear_amount)?
            .checked_sub(&inputs.received_amount)?,
        BillingPhase::Carry => inputs
            .previous_balance
            .checked_sub(&inputs.received_amount)?
            .checked_sub(&inputs.received_arrear_amount)?,
    };

    Ok(match policy {
        BalancePolicy::AllowNegative => balance,
        BalancePolicy::FloorAtZero => balance.floor_at_zero(),
    })
}

/// The balance the carry formula starts from
///
/// The immediate predecessor's balance when there is one. The very first
/// invoice of an enrollment on a carry day starts from its own installment
/// amount, so payments before the first reset are tracked against a non-zero
/// anchor. A first invoice on the reset day does not use this value.
pub fn opening_balance(prior: Option<&Invoice>, phase: BillingPhase, due_amount: Money) -> Money {
    match (prior, phase) {
        (Some(prior), _) => prior.balance_amount,
        (None, BillingPhase::Carry) => due_amount,
        (None, BillingPhase::Reset) => Money::zero(due_amount.currency()),
    }
}
