use crate::config::{parse_env, ConfigError, DatabaseConfig};
use std::env;
use std::str::FromStr;

/// Configuration loaded from the process environment
pub trait AppConfigTrait: Sized {
    /// Read, parse and validate
    fn from_env() -> Result<Self, ConfigError>;

    fn validate(&self) -> Result<(), ConfigError>;
}

/// Deployment environment, from `ENVIRONMENT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::invalid(
                "ENVIRONMENT",
                s,
                "development, testing, or production",
            )),
        }
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }

    /// Production disables diagnostics in error envelopes and requires
    /// explicit database credentials
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Version segment of the API mount point (`/api/{version}/...`)
    pub api_version: String,
    /// Whether error envelopes carry internal diagnostics
    pub expose_error_details: bool,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            api_version: "v1".to_string(),
            expose_error_details: true,
            database: DatabaseConfig::default(),
        }
    }

    /// Create configuration for testing
    pub fn testing() -> Self {
        Self {
            environment: Environment::Testing,
            port: 0,
            log_level: "warn".to_string(),
            ..Self::new()
        }
    }

    /// Create configuration for production
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            host: "0.0.0.0".to_string(),
            port: 8080,
            expose_error_details: false,
            ..Self::new()
        }
    }

    /// Get the bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigTrait for AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(env_str) = env::var("ENVIRONMENT") {
            config.environment = env_str.parse()?;
        }

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }

        if let Some(port) = parse_env("PORT", "valid port number (0-65535)")? {
            config.port = port;
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level.to_lowercase();
        }

        if let Ok(version) = env::var("API_VERSION") {
            config.api_version = version;
        }

        // Diagnostics default to on everywhere except production
        config.expose_error_details = parse_env("EXPOSE_ERROR_DETAILS", "true or false")?
            .unwrap_or(!config.environment.is_production());

        config.database = DatabaseConfig::from_env(&config.environment)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.environment.is_testing() && self.port == 0 {
            return Err(ConfigError::invalid(
                "PORT",
                self.port.to_string(),
                "port between 1 and 65535",
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid(
                "LOG_LEVEL",
                &self.log_level,
                format!("one of: {}", valid_levels.join(", ")),
            ));
        }

        let version_ok = !self.api_version.is_empty()
            && self
                .api_version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if !version_ok {
            return Err(ConfigError::invalid(
                "API_VERSION",
                &self.api_version,
                "a single path segment such as v1",
            ));
        }

        if self.environment.is_production() && self.expose_error_details {
            tracing::warn!("EXPOSE_ERROR_DETAILS is ignored in production; error envelopes never carry diagnostics there");
        }

        self.database.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clean_env() {
        for var in [
            "ENVIRONMENT",
            "HOST",
            "PORT",
            "LOG_LEVEL",
            "API_VERSION",
            "EXPOSE_ERROR_DETAILS",
            "DB_USER",
            "DB_PASSWORD",
            "DB_NAME",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Testing".parse::<Environment>().unwrap(), Environment::Testing);
        let err = "staging".parse::<Environment>().unwrap_err();
        assert_eq!(err.variable(), Some("ENVIRONMENT"));
    }

    #[test]
    fn test_port_zero_allowed_only_in_testing() {
        let config = AppConfig::testing();
        assert!(config.validate().is_ok());

        let mut config = AppConfig::new();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_version_must_be_single_segment() {
        let mut config = AppConfig::new();
        config.api_version = "v1/../admin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_error_details_follow_environment() {
        clean_env();
        env::set_var("ENVIRONMENT", "production");
        env::set_var("DB_USER", "svc");
        env::set_var("DB_PASSWORD", "secret");
        env::set_var("DB_NAME", "prod");

        let config = AppConfig::from_env().unwrap();
        assert!(config.environment.is_production());
        assert!(!config.expose_error_details);

        env::set_var("ENVIRONMENT", "development");
        let config = AppConfig::from_env().unwrap();
        assert!(config.expose_error_details);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_explicit_error_details_flag_wins() {
        clean_env();
        env::set_var("EXPOSE_ERROR_DETAILS", "false");
        let config = AppConfig::from_env().unwrap();
        assert!(!config.expose_error_details);
        clean_env();
    }
}
