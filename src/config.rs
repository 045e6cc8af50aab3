use crate::domain::entities::DEFAULT_MAX_CHATS;
use crate::domain::services::window;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub sweep_interval_minutes: u64,
    pub engine: EngineSettings,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: u16,
}

/// Thresholds and limits consumed by the distribution services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Hours an owner may stay silent while the customer waits before the sweep reassigns.
    pub stale_assignment_hours: i64,
    /// Minutes without heartbeat before the sweep forces an attendant offline.
    pub inactivity_minutes: i64,
    pub default_max_chats: i64,
    /// Selection attempts per distribution before reporting no attendant available.
    pub max_distribution_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            stale_assignment_hours: 24,
            inactivity_minutes: 10,
            default_max_chats: DEFAULT_MAX_CHATS,
            max_distribution_attempts: 3,
        }
    }
}

impl EngineSettings {
    /// Thresholds must be non-negative and small enough to subtract from a timestamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        window::hours_threshold(self.stale_assignment_hours)
            .map_err(|_| ConfigError::InvalidThreshold("STALE_ASSIGNMENT_HOURS"))?;
        window::minutes_threshold(self.inactivity_minutes)
            .map_err(|_| ConfigError::InvalidThreshold("INACTIVITY_MINUTES"))?;
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = EngineSettings::default();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://wadesk.db?mode=rwc".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let sweep_interval_minutes = parse_or("SWEEP_INTERVAL_MINUTES", 30u64);
        if sweep_interval_minutes == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }

        let engine = EngineSettings {
            stale_assignment_hours: parse_or(
                "STALE_ASSIGNMENT_HOURS",
                defaults.stale_assignment_hours,
            ),
            inactivity_minutes: parse_or("INACTIVITY_MINUTES", defaults.inactivity_minutes),
            default_max_chats: parse_or("DEFAULT_MAX_CHATS", defaults.default_max_chats).max(0),
            max_distribution_attempts: parse_or(
                "DISTRIBUTION_MAX_ATTEMPTS",
                defaults.max_distribution_attempts,
            )
            .max(1),
        };
        engine.validate()?;

        let otel_exporter_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let service_name = env::var("SERVICE_NAME").unwrap_or_else(|_| "wadesk".to_string());

        let metrics_port = parse_or("METRICS_PORT", 9000u16);

        Ok(Config {
            database_url,
            server_host,
            server_port,
            sweep_interval_minutes,
            engine,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("SWEEP_INTERVAL_MINUTES must be greater than zero")]
    InvalidSweepInterval,

    #[error("{0} must be a non-negative duration within range")]
    InvalidThreshold(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults_follow_recommended_thresholds() {
        let settings = EngineSettings::default();
        assert_eq!(settings.stale_assignment_hours, 24);
        assert_eq!(settings.inactivity_minutes, 10);
        assert_eq!(settings.default_max_chats, 3);
        assert_eq!(settings.max_distribution_attempts, 3);
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        env::set_var("WADESK_TEST_PARSE_OR", "not-a-number");
        assert_eq!(parse_or("WADESK_TEST_PARSE_OR", 7i64), 7);
        env::set_var("WADESK_TEST_PARSE_OR", "12");
        assert_eq!(parse_or("WADESK_TEST_PARSE_OR", 7i64), 12);
        env::remove_var("WADESK_TEST_PARSE_OR");
    }

    #[test]
    fn test_engine_settings_reject_negative_or_huge_thresholds() {
        assert!(EngineSettings::default().validate().is_ok());

        let negative = EngineSettings {
            inactivity_minutes: -5,
            ..EngineSettings::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidThreshold("INACTIVITY_MINUTES"))
        ));

        let huge = EngineSettings {
            stale_assignment_hours: i64::MAX / 1000,
            ..EngineSettings::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::InvalidThreshold("STALE_ASSIGNMENT_HOURS"))
        ));
    }
}
