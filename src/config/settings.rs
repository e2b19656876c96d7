//! Runtime settings read from the process environment (optionally seeded by `.env`).

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Deployment environment. Administrative operations are gated on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
    Testing,
}

impl Environment {
    /// Bulk wipe of all books and authors is only available outside production.
    pub fn allows_bulk_delete(self) -> bool {
        !matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

impl Settings {
    /// Load from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. `DATABASE_URL` is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or("APP_PORT", lookup("APP_PORT"), DEFAULT_PORT)?;
        let host = lookup("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let environment = match lookup("APP_ENV") {
            Some(v) => v.parse()?,
            None => Environment::default(),
        };
        let max_connections = parse_or(
            "DB_MAX_CONNECTIONS",
            lookup("DB_MAX_CONNECTIONS"),
            DEFAULT_MAX_CONNECTIONS,
        )?;
        let acquire_secs = parse_or(
            "DB_ACQUIRE_TIMEOUT_SECS",
            lookup("DB_ACQUIRE_TIMEOUT_SECS"),
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        )?;
        Ok(Settings {
            database: DatabaseSettings {
                url,
                max_connections,
                acquire_timeout: Duration::from_secs(acquire_secs),
            },
            host,
            port,
            environment,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => match v.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let settings = Settings::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/books")])).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.bind_addr(), "0.0.0.0:8080");
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.database.acquire_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Settings::from_lookup(lookup_from(&[("APP_PORT", "9000")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn invalid_port_names_the_key() {
        let err = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("APP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_PORT", .. }));
    }

    #[test]
    fn environment_gates_bulk_delete() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("APP_ENV", "Testing"),
        ]))
        .unwrap();
        assert_eq!(settings.environment, Environment::Testing);
        assert!(settings.environment.allows_bulk_delete());
        assert!(!Environment::Production.allows_bulk_delete());
        assert!("staging".parse::<Environment>().is_err());
    }
}
