use std::env;

use crate::error::{AppError, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/azbp.db";
const DEFAULT_ANALYTICS_SALT: &str = "salt";

/// Runtime settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub production: bool,
    pub analytics_salt: String,
    pub session_ttl_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("APP_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let analytics_salt = match lookup("ANALYTICS_SALT") {
            Some(salt) if !salt.is_empty() => salt,
            _ if production => {
                return Err(AppError::Config(
                    "ANALYTICS_SALT must be set in production".into(),
                ))
            }
            _ => DEFAULT_ANALYTICS_SALT.to_string(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8082)?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            production,
            analytics_salt,
            session_ttl_days: parse_or(&lookup, "SESSION_TTL_DAYS", 7)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8082");
        assert_eq!(config.session_ttl_days, 7);
        assert!(!config.production);
        assert_eq!(config.analytics_salt, "salt");
    }

    #[test]
    fn production_requires_salt() {
        assert!(config_from(&[("APP_ENV", "production")]).is_err());
        let config =
            config_from(&[("APP_ENV", "production"), ("ANALYTICS_SALT", "pepper")]).unwrap();
        assert!(config.production);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert_eq!(config_from(&[("PORT", "9000")]).unwrap().port, 9000);
    }
}
