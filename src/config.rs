//! Runtime configuration loaded from the environment.
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file by `dotenv` in `main`. Only `DATABASE_URL` is required.

use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use once_cell::sync::OnceCell;

static ENVIRONMENT: OnceCell<Environment> = OnceCell::new();

/// Deployment environment, which decides how much error detail clients see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow!(
                "unknown environment `{other}`, expected `development` or `production`"
            )),
        }
    }
}

/// Records the process-wide environment. Later calls are ignored.
pub fn set_environment(environment: Environment) {
    let _ = ENVIRONMENT.set(environment);
}

/// The environment recorded at startup, `Development` if none was recorded.
pub fn environment() -> Environment {
    ENVIRONMENT.get().copied().unwrap_or_default()
}

/// Server settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// PostgreSQL connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Interface to bind (`APP_HOST`, default `127.0.0.1`)
    pub host: String,
    /// Port to bind (`APP_PORT`, default `8080`)
    pub port: u16,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`, default `5`)
    pub max_connections: u32,
    /// `APP_ENV`, default development
    pub environment: Environment,
    /// Tracing filter directive (`RUST_LOG`, default `info`)
    pub log_filter: String,
}

impl Settings {
    /// Reads settings from environment variables.
    ///
    /// # Errors
    ///
    /// Fails when `DATABASE_URL` is missing or when an optional variable is
    /// present but cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            host: env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("APP_PORT", 8080)?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            environment: parse_var("APP_ENV", Environment::Development)?,
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value `{raw}` for {name}: {e}")),
        Err(_) => Ok(default),
    }
}
