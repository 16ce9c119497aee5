use crate::config::{parse_env, ConfigError, Environment};
use std::env;
use std::fmt;
use std::time::Duration;

/// Database endpoint, credentials and pool behaviour consumed by the gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Upper bound on live connections held by the pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long a checkout may wait for a free connection
    pub acquire_timeout: Duration,
    /// Deadline for a single routine call, begin, commit or rollback
    pub call_timeout: Duration,
    /// Retries for transient connection failures outside a transaction
    pub max_retries: u32,
    /// Linear backoff step between retries
    pub retry_backoff: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "sluice".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

impl DatabaseConfig {
    /// Load database settings from `DB_*` environment variables.
    ///
    /// Credentials fall back to development defaults everywhere except in
    /// production, where `DB_USER`, `DB_PASSWORD` and `DB_NAME` must be set.
    pub fn from_env(environment: &Environment) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = env::var("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_env("DB_PORT", "valid port number (1-65535)")? {
            config.port = port;
        }

        for (var, slot) in [
            ("DB_USER", &mut config.user),
            ("DB_PASSWORD", &mut config.password),
            ("DB_NAME", &mut config.database),
        ] {
            match env::var(var) {
                Ok(value) => *slot = value,
                Err(_) if environment.is_production() => {
                    return Err(ConfigError::missing(
                        var,
                        format!("{} environment variable is required in production", var),
                    ));
                }
                Err(_) => {}
            }
        }

        if let Some(max) = parse_env("DB_MAX_CONNECTIONS", "positive integer")? {
            config.max_connections = max;
        }
        if let Some(min) = parse_env("DB_MIN_CONNECTIONS", "non-negative integer")? {
            config.min_connections = min;
        }
        if let Some(secs) = parse_env::<u64>("DB_ACQUIRE_TIMEOUT_SECS", "seconds as integer")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("DB_CALL_TIMEOUT_SECS", "seconds as integer")? {
            config.call_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env("DB_MAX_RETRIES", "non-negative integer")? {
            config.max_retries = retries;
        }
        if let Some(millis) = parse_env::<u64>("DB_RETRY_BACKOFF_MS", "milliseconds as integer")? {
            config.retry_backoff = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the environment parser cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("DB_HOST", &self.host, "non-empty host name"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("DB_PORT", "0", "port between 1 and 65535"));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::invalid("DB_NAME", &self.database, "non-empty database name"));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::invalid("DB_MAX_CONNECTIONS", "0", "at least 1"));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::inconsistent(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::invalid("DB_CALL_TIMEOUT_SECS", "0", "at least 1 second"));
        }
        Ok(())
    }

    /// `host:port/database`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("call_timeout", &self.call_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}
