use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

use crate::error::AppError;

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub vote_window_hours: i64,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let redis_url: String = try_load("REDIS_URL", "redis://redis:6379")?;

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: with_password(&redis_url, read_secret("REDIS_PASSWORD").as_deref()),
            vote_window_hours: try_load("VOTE_WINDOW_HOURS", "48")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            redis_url: "redis://redis:6379".to_string(),
            vote_window_hours: 48,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse_value(key, &value)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        AppError::Config(format!("{key}: {e}"))
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret read, continuing without it: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

/// Injects a password into a `redis://host` style URL that carries no credentials.
fn with_password(redis_url: &str, password: Option<&str>) -> String {
    let Some(password) = password else {
        return redis_url.to_string();
    };

    match redis_url.split_once("://") {
        Some((scheme, rest)) if !rest.contains('@') => format!("{scheme}://:{password}@{rest}"),
        _ => redis_url.to_string(),
    }
}
