use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use common_auth::{JwtConfig, DEFAULT_TOKEN_TTL_SECONDS};

use crate::app::HttpOptions;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_NAME: &str = "bistro-boss";
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo {
        uri: String,
        database: String,
        transactions: bool,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub store: StoreBackend,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub currency: String,
    pub gateway_timeout: Duration,
    pub http: HttpOptions,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

        let secret = var("ACCESS_TOKEN_SECRET")
            .ok_or_else(|| anyhow!("ACCESS_TOKEN_SECRET must be set"))?;
        let ttl = parse_or(var("JWT_TTL_SECONDS"), DEFAULT_TOKEN_TTL_SECONDS)
            .context("Failed to parse JWT_TTL_SECONDS")?;
        let leeway = parse_or(var("JWT_LEEWAY_SECONDS"), 0u32)
            .context("Failed to parse JWT_LEEWAY_SECONDS")?;

        let store = match var("STORE_BACKEND")
            .unwrap_or_else(|| "mongo".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "mongo" | "mongodb" => StoreBackend::Mongo {
                uri: var("DB_URI").ok_or_else(|| anyhow!("DB_URI must be set for the mongo backend"))?,
                database: var("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
                transactions: bool_value(var("MONGO_TRANSACTIONS")).unwrap_or(true),
            },
            "memory" => StoreBackend::Memory,
            other => return Err(anyhow!("Unsupported STORE_BACKEND '{other}'. Use mongo or memory.")),
        };

        let timeout_secs = parse_or(var("GATEWAY_TIMEOUT_SECONDS"), 10u64)
            .context("Failed to parse GATEWAY_TIMEOUT_SECONDS")?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|value| parse_origins(&value))
            .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]);

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("PORT"), DEFAULT_PORT).context("Failed to parse PORT")?,
            jwt: JwtConfig::new(secret).with_ttl(ttl).with_leeway(leeway),
            store,
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_api_base: var("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
            currency: var("PAYMENT_CURRENCY")
                .map(|value| value.to_ascii_lowercase())
                .unwrap_or_else(|| "usd".to_string()),
            gateway_timeout: Duration::from_secs(timeout_secs),
            http: HttpOptions {
                cors_origins,
                legacy_error_status: bool_value(var("LEGACY_ERROR_STATUS")).unwrap_or(true),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| anyhow!("invalid value '{raw}': {err}")),
        None => Ok(default),
    }
}

fn bool_value(value: Option<String>) -> Option<bool> {
    value.map(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
