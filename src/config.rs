//! Process configuration read from the environment.

use rust_decimal::Decimal;
use std::env::VarError;
use std::net::{Ipv4Addr, SocketAddr};
use thiserror::Error;

use crate::domain::aggregates::ShippingPolicy;
use crate::store::PoolConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnvVar(String),
    #[error("{var} is invalid: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub port: u16,
    pub log_level: String,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub currency: String,
    pub shipping: ShippingPolicy,
    pub low_stock_threshold: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend", &self.backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("nats_url", &self.nats_url)
            .field("currency", &self.currency)
            .field("shipping", &self.shipping)
            .field("low_stock_threshold", &self.low_stock_threshold)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            port: 8083,
            log_level: "info".into(),
            db_max_connections: 10,
            nats_url: None,
            currency: "USD".into(),
            shipping: ShippingPolicy::default(),
            low_stock_threshold: 5,
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Parsing core, decoupled from the real environment so tests can feed a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let or_default = |var: &str, default: &str| lookup(var).unwrap_or_else(|_| default.to_string());
        let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar { var: var.to_string(), reason };

        let backend = match or_default("STORE_BACKEND", "postgres").to_ascii_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(invalid("STORE_BACKEND", format!("expected postgres or memory, got {other}"))),
        };
        let database_url = lookup("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".into()));
        }

        let port = or_default("PORT", "8083").parse::<u16>().map_err(|e| invalid("PORT", e.to_string()))?;
        let db_max_connections = or_default("DB_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| invalid("DB_MAX_CONNECTIONS", e.to_string()))?;
        let low_stock_threshold = or_default("LOW_STOCK_THRESHOLD", "5")
            .parse::<u32>()
            .map_err(|e| invalid("LOW_STOCK_THRESHOLD", e.to_string()))?;

        let money = |var: &str, default: &str| -> Result<Decimal, ConfigError> {
            let amount = or_default(var, default).parse::<Decimal>().map_err(|e| invalid(var, e.to_string()))?;
            if amount.is_sign_negative() { return Err(invalid(var, "must not be negative".into())); }
            Ok(amount)
        };
        let shipping = ShippingPolicy {
            free_over: money("FREE_SHIPPING_THRESHOLD", "100")?,
            flat_rate: money("FLAT_SHIPPING_COST", "4.99")?,
        };

        let currency = or_default("STORE_CURRENCY", "USD").trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid("STORE_CURRENCY", "expected a three-letter ISO 4217 code".into()));
        }

        Ok(Self {
            backend,
            database_url,
            port,
            log_level: or_default("RUST_LOG", "info"),
            db_max_connections,
            nats_url: lookup("NATS_URL").ok().filter(|url| !url.trim().is_empty()),
            currency,
            shipping,
            low_stock_threshold,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr { SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)) }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig { max_connections: self.db_max_connections, ..PoolConfig::default() }
    }
}
