//! Billing configuration

use serde::{Deserialize, Serialize};

use core_kernel::Timezone;

use crate::balance::BalancePolicy;

/// Settings that change billing outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Whether overpayment may leave a negative (credit) balance
    ///
    /// When false every computed balance is floored at zero.
    pub allow_negative_balance: bool,
    /// Zero-padding width of formatted invoice numbers
    pub invoice_number_width: usize,
    /// Timezone that decides "today" when a request carries no invoice date
    pub timezone: Timezone,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            allow_negative_balance: false,
            invoice_number_width: 6,
            timezone: Timezone::default(),
        }
    }
}

impl BillingConfig {
    pub fn balance_policy(&self) -> BalancePolicy {
        if self.allow_negative_balance {
            BalancePolicy::AllowNegative
        } else {
            BalancePolicy::FloorAtZero
        }
    }

    /// Formats a sequence value as a zero-padded invoice number
    pub fn format_invoice_number(&self, sequence: u64) -> String {
        format!("{:0width$}", sequence, width = self.invoice_number_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clamps_balances() {
        let config = BillingConfig::default();
        assert_eq!(config.balance_policy(), BalancePolicy::FloorAtZero);
    }

    #[test]
    fn test_format_invoice_number() {
        let config = BillingConfig::default();
        assert_eq!(config.format_invoice_number(42), "000042");
        assert_eq!(config.format_invoice_number(1_234_567), "1234567");
    }
}
