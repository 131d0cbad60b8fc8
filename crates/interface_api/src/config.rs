//! API configuration

use serde::Deserialize;

use core_kernel::{CoreError, Timezone};
use domain_billing::BillingConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// `json` for JSON log lines, anything else for text
    pub log_format: String,
    /// Keep negative (credit) balances instead of flooring them at zero
    pub allow_negative_balance: bool,
    /// Zero-padding width of invoice numbers
    pub invoice_number_width: usize,
    /// IANA timezone deciding "today" for undated invoices and refreshes
    pub timezone: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/chit".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            allow_negative_balance: false,
            invoice_number_width: 6,
            timezone: "Asia/Kolkata".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Derives the billing settings
    pub fn billing_config(&self) -> Result<BillingConfig, CoreError> {
        let timezone: Timezone = self.timezone.parse()?;
        if self.invoice_number_width == 0 {
            return Err(CoreError::configuration("invoice_number_width must be positive"));
        }

        Ok(BillingConfig {
            allow_negative_balance: self.allow_negative_balance,
            invoice_number_width: self.invoice_number_width,
            timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_billing_config() {
        let billing = ApiConfig::default().billing_config().unwrap();
        assert!(!billing.allow_negative_balance);
        assert_eq!(billing.format_invoice_number(7), "000007");
        assert_eq!(billing.timezone.name(), "Asia/Kolkata");
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let config = ApiConfig {
            timezone: "Mars/Olympus".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(config.billing_config(), Err(CoreError::Temporal(_))));
    }

    #[test]
    fn test_zero_width_rejected() {
        let config = ApiConfig {
            invoice_number_width: 0,
            ..ApiConfig::default()
        };
        assert!(matches!(config.billing_config(), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(ApiConfig::default().server_addr(), "0.0.0.0:8080");
    }
}
