use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub primary_url: String,
    pub pool: PoolConfig,
    pub health_check: HealthCheckConfig,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let primary_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(DbConfigError::Missing {
                key: "DATABASE_URL",
            })?;

        Ok(Self {
            primary_url,
            pool: PoolConfig::from_env(),
            health_check: HealthCheckConfig::from_env(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    fn from_env() -> Self {
        let max_connections = env_u32("DB_MAX_CONNECTIONS", 10);
        let acquire_timeout_ms = env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000);

        Self {
            max_connections,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub timeout: Duration,
}

impl HealthCheckConfig {
    pub fn from_env() -> Self {
        let timeout_ms = env_u64("DB_HEALTH_CHECK_TIMEOUT_MS", 3000);

        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("missing required env var {key}")]
    Missing { key: &'static str },
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
