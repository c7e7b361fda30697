use std::{env, fmt::Display, net::IpAddr, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        if jwt_secret.len() < 16 {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: String::from("must be at least 16 bytes long"),
            });
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            jwt_secret,
            session_hours: try_load(&lookup, "SESSION_HOURS", "24")?,
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "8000")?,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}
