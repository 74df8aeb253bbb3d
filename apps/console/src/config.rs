//! Console configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                 | Default                 |
//! |--------------------------|-------------------------|
//! | `IICM_API_URL`           | `http://localhost:8000` |
//! | `IICM_API_TOKEN`         | unset (no auth header)  |
//! | `IICM_TAX_RATE_PERCENT`  | `10`                    |
//! | `IICM_EXCHANGE_RATE`     | `4100`                  |
//! | `IICM_HTTP_TIMEOUT_SECS` | `15`                    |

use iicm_core::invoice::PricingSettings;
use iicm_core::{ExchangeRate, Percent};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Console configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Base URL of the inventory API, without trailing slash
    pub api_url: String,

    /// Bearer token sent with every request
    pub api_token: Option<String>,

    /// Tax applied to new drafts
    pub tax_rate: Percent,

    /// Riel per US dollar
    pub exchange_rate: ExchangeRate,

    /// Per-request timeout
    pub http_timeout: Duration,
}

impl ConsoleConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_url = var("IICM_API_URL", "http://localhost:8000")
            .trim_end_matches('/')
            .to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue("IICM_API_URL".to_string()));
        }

        let tax_rate = Decimal::from_str(&var("IICM_TAX_RATE_PERCENT", "10"))
            .ok()
            .and_then(|v| Percent::new("tax rate", v).ok())
            .ok_or_else(|| ConfigError::InvalidValue("IICM_TAX_RATE_PERCENT".to_string()))?;

        let exchange_rate = Decimal::from_str(&var("IICM_EXCHANGE_RATE", "4100"))
            .ok()
            .and_then(|v| ExchangeRate::new(v).ok())
            .ok_or_else(|| ConfigError::InvalidValue("IICM_EXCHANGE_RATE".to_string()))?;

        let http_timeout_secs: u64 = var("IICM_HTTP_TIMEOUT_SECS", "15")
            .parse()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidValue("IICM_HTTP_TIMEOUT_SECS".to_string()))?;

        Ok(ConsoleConfig {
            api_url,
            api_token: lookup("IICM_API_TOKEN").filter(|t| !t.trim().is_empty()),
            tax_rate,
            exchange_rate,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    /// Rates for new drafts.
    pub fn pricing(&self) -> PricingSettings {
        PricingSettings {
            tax_rate: self.tax_rate,
            exchange_rate: self.exchange_rate,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
