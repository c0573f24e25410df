//! Server configuration.

use std::env;
use std::time::Duration;

use task_store::PgStoreOptions;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database URL. Without one only the in-memory routes are served.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub db_max_connections: u32,
    /// Redis URL. Without one an in-process cache is used.
    pub redis_url: Option<String>,
    /// Lifetime of a cached task list.
    pub cache_ttl: Duration,
    /// JWT secret (required when a database is configured).
    pub jwt_secret: Option<String>,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Upper bound for handling one request.
    pub request_timeout: Duration,
    /// Log level.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            db_max_connections: task_store::postgres::DEFAULT_MAX_CONNECTIONS,
            redis_url: None,
            cache_ttl: task_store::TASKS_CACHE_TTL,
            jwt_secret: None,
            jwt_expiration_hours: auth::DEFAULT_JWT_EXPIRATION_HOURS,
            request_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = non_empty_var("DATABASE_URL");
        let jwt_secret = non_empty_var("TASKS_JWT_SECRET");
        if database_url.is_some() && jwt_secret.is_none() {
            anyhow::bail!("TASKS_JWT_SECRET is required when DATABASE_URL is set");
        }

        Ok(Self {
            host: env::var("TASKS_SERVER_HOST").unwrap_or(defaults.host),
            port: parsed_var("TASKS_SERVER_PORT")?.unwrap_or(defaults.port),
            database_url,
            db_max_connections: parsed_var("TASKS_DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.db_max_connections),
            redis_url: non_empty_var("REDIS_URL"),
            cache_ttl: parsed_var("TASKS_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            jwt_secret,
            jwt_expiration_hours: parsed_var("TASKS_JWT_EXPIRATION_HOURS")?
                .unwrap_or(defaults.jwt_expiration_hours),
            request_timeout: parsed_var("TASKS_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            log_level: env::var("TASKS_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if the database-backed routes should be served.
    pub fn database_enabled(&self) -> bool {
        self.database_url.is_some()
    }

    /// Returns the connection pool settings.
    pub fn store_options(&self) -> PgStoreOptions {
        PgStoreOptions {
            max_connections: self.db_max_connections,
            ..PgStoreOptions::default()
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    non_empty_var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid {name}: {e}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_configuration() {
        // SAFETY: this is the only test in the crate touching these variables
        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("TASKS_JWT_SECRET");
            env::remove_var("TASKS_SERVER_PORT");
        }

        let config = Config::from_env().unwrap();
        assert!(!config.database_enabled());
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));

        unsafe {
            env::set_var("DATABASE_URL", "postgres://localhost/tasks");
        }
        assert!(Config::from_env().is_err());

        unsafe {
            env::set_var("TASKS_JWT_SECRET", "secret");
            env::set_var("TASKS_SERVER_PORT", "9000");
        }
        let config = Config::from_env().unwrap();
        assert!(config.database_enabled());
        assert_eq!(config.port, 9000);

        unsafe {
            env::set_var("TASKS_SERVER_PORT", "not-a-port");
        }
        assert!(Config::from_env().is_err());

        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("TASKS_JWT_SECRET");
            env::remove_var("TASKS_SERVER_PORT");
        }
    }

    #[test]
    fn test_server_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
        assert_eq!(config.store_options().max_connections, 25);
    }
}
