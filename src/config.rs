//! Configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The binary loads a `.env` file first when one is present.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub fulfillment: FulfillmentConfig,
    pub webhook: WebhookConfig,
    pub stores: StoreConfig,
}

/// Fulfillment pipeline settings
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// Ticket validity from creation (`TICKET_EXPIRATION`, days, default 30)
    pub ticket_term: TimeDelta,
    /// Unit tasks running at once per event (`FULFILLMENT_MAX_CONCURRENCY`, default 16)
    pub max_concurrent_tasks: usize,
    /// Bound on the per-event barrier (`FULFILLMENT_TIMEOUT_SECS`, default 25)
    pub processing_timeout: Duration,
}

/// Webhook endpoint settings
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Signing secret shared with the gateway (`WEBHOOK_SECRET_STRIPE`)
    pub secret: Option<String>,
    /// Accepted clock skew of signed deliveries (`WEBHOOK_TOLERANCE_SECS`, default 300)
    pub tolerance: Duration,
    /// Serve the webhook route on this address when set (`WEBHOOK_BIND_ADDR`)
    pub bind_addr: Option<SocketAddr>,
}

/// Store actor settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Mailbox size of each store actor (`ACTOR_BUFFER_SIZE`, default 100)
    pub buffer_size: usize,
    /// Bound on each store request including lock waits (`STORE_REQUEST_TIMEOUT_MS`, default 5000)
    pub request_timeout: Duration,
}

pub const DEFAULT_TICKET_EXPIRATION_DAYS: i64 = 30;
const MAX_TICKET_EXPIRATION_DAYS: i64 = 3650;

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            ticket_term: TimeDelta::days(DEFAULT_TICKET_EXPIRATION_DAYS),
            max_concurrent_tasks: 16,
            processing_timeout: Duration::from_secs(25),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret: None, tolerance: Duration::from_secs(300), bind_addr: None }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { buffer_size: 100, request_timeout: Duration::from_millis(5000) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fulfillment: FulfillmentConfig::default(),
            webhook: WebhookConfig::default(),
            stores: StoreConfig::default(),
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.into() }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn positive<T: PartialOrd + Default + ToString>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(invalid(key, &value.to_string(), "must be positive"))
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for malformed or out-of-range values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let days = positive("TICKET_EXPIRATION", parse_or(&lookup, "TICKET_EXPIRATION", DEFAULT_TICKET_EXPIRATION_DAYS)?)?;
        if days > MAX_TICKET_EXPIRATION_DAYS {
            return Err(invalid("TICKET_EXPIRATION", &days.to_string(), format!("at most {MAX_TICKET_EXPIRATION_DAYS} days")));
        }
        let ticket_term = TimeDelta::try_days(days)
            .ok_or_else(|| invalid("TICKET_EXPIRATION", &days.to_string(), "out of range"))?;

        let fulfillment = FulfillmentConfig {
            ticket_term,
            max_concurrent_tasks: positive(
                "FULFILLMENT_MAX_CONCURRENCY",
                parse_or(&lookup, "FULFILLMENT_MAX_CONCURRENCY", 16usize)?,
            )?,
            processing_timeout: Duration::from_secs(positive(
                "FULFILLMENT_TIMEOUT_SECS",
                parse_or(&lookup, "FULFILLMENT_TIMEOUT_SECS", 25u64)?,
            )?),
        };

        let bind_addr = match lookup("WEBHOOK_BIND_ADDR") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<SocketAddr>()
                    .map_err(|e| invalid("WEBHOOK_BIND_ADDR", &raw, e.to_string()))?,
            ),
            _ => None,
        };
        let webhook = WebhookConfig {
            secret: lookup("WEBHOOK_SECRET_STRIPE").filter(|secret| !secret.trim().is_empty()),
            tolerance: Duration::from_secs(parse_or(&lookup, "WEBHOOK_TOLERANCE_SECS", 300u64)?),
            bind_addr,
        };

        let stores = StoreConfig {
            buffer_size: positive("ACTOR_BUFFER_SIZE", parse_or(&lookup, "ACTOR_BUFFER_SIZE", 100usize)?)?,
            request_timeout: Duration::from_millis(positive(
                "STORE_REQUEST_TIMEOUT_MS",
                parse_or(&lookup, "STORE_REQUEST_TIMEOUT_MS", 5000u64)?,
            )?),
        };

        Ok(Self { fulfillment, webhook, stores })
    }
}
