//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use domain::CancellationPolicy;
use fulfillment::LifecycleConfig;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `PAYMENT_TIMEOUT_MS`: bound on one payment attempt (default: `5000`)
/// - `CURRENCY`: currency passed to the payment gateway (default: `"eur"`)
/// - `PRODUCER_CANCEL_RESTOCKS_PENDING`, `PRODUCER_CANCEL_RESTOCKS_PREPARING`:
///   whether a producer cancellation restocks by default (default: `false`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub payment_timeout: Duration,
    pub currency: String,
    pub cancellation: CancellationPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str| {
            var(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed(&var, "PORT").unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: var("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed(&var, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            payment_timeout: parsed(&var, "PAYMENT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment_timeout),
            currency: var("CURRENCY").unwrap_or(defaults.currency),
            cancellation: CancellationPolicy {
                producer_restocks_pending: flag("PRODUCER_CANCEL_RESTOCKS_PENDING"),
                producer_restocks_preparing: flag("PRODUCER_CANCEL_RESTOCKS_PREPARING"),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the order lifecycle engine.
    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            payment_timeout: self.payment_timeout,
            currency: self.currency.clone(),
            cancellation: self.cancellation,
        }
    }
}

fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    var(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        let lifecycle = LifecycleConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            payment_timeout: lifecycle.payment_timeout,
            currency: lifecycle.currency,
            cancellation: lifecycle.cancellation,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.database_url, None);
        assert_eq!(config.payment_timeout, Duration::from_millis(5000));
        assert_eq!(config.currency, "eur");
        assert_eq!(config.cancellation, CancellationPolicy::default());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_environment() {
        let config = from_map(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_URL", "postgres://localhost/market"),
            ("PAYMENT_TIMEOUT_MS", "250"),
            ("CURRENCY", "usd"),
            ("PRODUCER_CANCEL_RESTOCKS_PENDING", "true"),
        ]);

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/market")
        );
        let lifecycle = config.lifecycle();
        assert_eq!(lifecycle.payment_timeout, Duration::from_millis(250));
        assert_eq!(lifecycle.currency, "usd");
        assert!(lifecycle.cancellation.producer_restocks_pending);
        assert!(!lifecycle.cancellation.producer_restocks_preparing);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_map(&[("PORT", "not-a-port"), ("DATABASE_URL", "  ")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, None);
    }
}
