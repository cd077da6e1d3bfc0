//! # Environment Configuration
//!
//! The deployment contract for every gridcall process is a fixed set of
//! environment variables; a missing variable is a fatal startup error.
//! `.env` files are honored for local runs via `dotenvy`.

use std::path::PathBuf;

use crate::errors::{GridcallError, GridcallResult};

/// Read a required environment variable or fail with a configuration error.
pub fn require_env(name: &str) -> GridcallResult<String> {
    std::env::var(name).map_err(|_| {
        GridcallError::config_error(format!(
            "Environment variable '{name}' is required but not set"
        ))
    })
}

fn require_env_parsed<T: std::str::FromStr>(name: &str) -> GridcallResult<T> {
    let raw = require_env(name)?;
    raw.parse().map_err(|_| {
        GridcallError::config_error(format!(
            "Environment variable '{name}' has invalid value '{raw}'"
        ))
    })
}

/// Connection parameters for the shared relational store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl DatabaseConfig {
    /// Load from `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`.
    pub fn from_env() -> GridcallResult<Self> {
        let _ = dotenvy::dotenv();
        Ok(Self {
            host: require_env("DB_HOST")?,
            port: require_env_parsed("DB_PORT")?,
            user: require_env("DB_USER")?,
            password: require_env("DB_PASSWORD")?,
            name: require_env("DB_NAME")?,
        })
    }
}

/// Gateway process configuration.
///
/// `pool_size` bounds both the store connection pool and the gateway's
/// request concurrency so the two cannot starve each other.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    pub project_dir: PathBuf,
}

impl ServiceConfig {
    /// Load from `TASK_SERVICE_HOST`, `TASK_SERVICE_PORT`,
    /// `TASK_SERVICE_POOL_SIZE`, `PROJECT_DIR`.
    pub fn from_env() -> GridcallResult<Self> {
        let _ = dotenvy::dotenv();
        Ok(Self {
            host: require_env("TASK_SERVICE_HOST")?,
            port: require_env_parsed("TASK_SERVICE_PORT")?,
            pool_size: require_env_parsed("TASK_SERVICE_POOL_SIZE")?,
            project_dir: PathBuf::from(require_env("PROJECT_DIR")?),
        })
    }

    /// Socket address string the gateway binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// VCH project root for the one-shot daemons, which need no service config.
pub fn project_dir_from_env() -> GridcallResult<PathBuf> {
    let _ = dotenvy::dotenv();
    Ok(PathBuf::from(require_env("PROJECT_DIR")?))
}
