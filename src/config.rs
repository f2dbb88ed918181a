//! Runtime configuration read from the environment.
//!
//! A `.env` file in the working directory is loaded first (if present), then
//! every setting is read from its environment variable with a default.

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "school-api-dev-secret-change-me";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// sqlx SQLite connection string.
    pub database_url: String,
    pub database_max_connections: u32,
    /// Active API version, e.g. `"1.0"`.
    pub api_version: String,
    /// HS256 secret used to verify bearer tokens.
    pub jwt_secret: String,
    /// Lifetime of cached list pages. `None` keeps them until invalidated.
    pub cache_ttl: Option<Duration>,
    /// Absolute base used to build `Location` headers.
    pub public_base_url: String,
    /// Load the demo professeurs/eleves/classes at startup.
    pub seed_demo_data: bool,
}

impl AppConfig {
    /// Load configuration from `.env` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` when a variable is set to a value that
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("SERVER_PORT", 8080u16)?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 5u32)?;
        let api_version = env::var("API_VERSION").unwrap_or_else(|_| "1.0".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cache_ttl = match env::var("CACHE_TTL_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.parse().map_err(|_| {
                Error::ConfigError(format!("CACHE_TTL_SECS must be a number, got {:?}", raw))
            })?)),
            Err(_) => None,
        };

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        let seed_demo_data = parse_var("SEED_DEMO_DATA", false)?;

        let config = AppConfig {
            host,
            port,
            database_url,
            database_max_connections,
            api_version,
            jwt_secret,
            cache_ttl,
            public_base_url,
            seed_demo_data,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration suitable for tests: in-memory store, fixed secret.
    pub fn for_tests() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            api_version: "1.0".to_string(),
            jwt_secret: "test-secret".to_string(),
            cache_ttl: None,
            public_base_url: "http://localhost".to_string(),
            seed_demo_data: false,
        }
    }

    /// Address the server listens on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<()> {
        if self.database_max_connections == 0 {
            return Err(Error::ConfigError(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        crate::versioning::ApiVersion::parse(&self.api_version).ok_or_else(|| {
            Error::ConfigError(format!(
                "API_VERSION must look like \"1.0\", got {:?}",
                self.api_version
            ))
        })?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::ConfigError(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = AppConfig::for_tests();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let mut config = AppConfig::for_tests();
        config.api_version = "latest".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_connections() {
        let mut config = AppConfig::for_tests();
        config.database_max_connections = 0;
        assert!(config.validate().is_err());
    }
}
