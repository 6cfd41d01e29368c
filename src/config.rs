use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::FixedOffset;

const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: Option<String>,
    /// Offset used to find local midnight when counting day streaks.
    pub streak_offset: FixedOffset,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_api_endpoint: String,
    pub llm_timeout: Duration,
    pub app_version: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_string("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = env_string("HOST")
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = env_string("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let streak_offset = env_string("STREAK_UTC_OFFSET_MINUTES")
            .and_then(|value| value.parse::<i32>().ok())
            .and_then(offset_from_minutes)
            .unwrap_or_else(utc);

        let llm_timeout = Duration::from_millis(
            env_string("LLM_TIMEOUT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_LLM_TIMEOUT_MS),
        );

        Self {
            host,
            port,
            log_level,
            jwt_secret: env_string("JWT_SECRET"),
            streak_offset,
            llm_api_key: env_string("LLM_API_KEY"),
            llm_model: env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_api_endpoint: env_string("LLM_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
            llm_timeout,
            app_version: env_string("APP_VERSION").unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info".to_string(),
            jwt_secret: None,
            streak_offset: utc(),
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            llm_timeout: Duration::from_millis(DEFAULT_LLM_TIMEOUT_MS),
            app_version: "unknown".to_string(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn utc() -> FixedOffset {
    crate::services::utc_offset()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_minutes_are_bounded() {
        assert_eq!(
            offset_from_minutes(120),
            FixedOffset::east_opt(2 * 3600)
        );
        assert_eq!(offset_from_minutes(-300), FixedOffset::west_opt(5 * 3600));
        assert_eq!(offset_from_minutes(24 * 60), None);
    }

    #[test]
    fn defaults_use_memory_friendly_values() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.streak_offset, utc());
        assert!(config.jwt_secret.is_none());
    }
}
