use crate::types::currency::Currency;
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://savings.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub currency: Currency,
    // "*" allows any origin
    pub cors_allow: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();
        Config::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |var: &'static str, default: &str| lookup(var).unwrap_or_else(|| default.to_owned());
        let invalid = |var: &'static str, value: String| ConfigError::Invalid { var, value };

        let listen_addr = get("FIRE_LISTEN_ADDR", DEFAULT_LISTEN_ADDR);
        let listen_addr = listen_addr
            .parse()
            .map_err(|_| invalid("FIRE_LISTEN_ADDR", listen_addr.clone()))?;

        let max_connections = get("FIRE_DB_MAX_CONNECTIONS", &DEFAULT_MAX_CONNECTIONS.to_string());
        let max_connections = match max_connections.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => return Err(invalid("FIRE_DB_MAX_CONNECTIONS", max_connections)),
        };

        let currency = match lookup("FIRE_CURRENCY") {
            Some(code) => Currency::from_code(&code).ok_or(invalid("FIRE_CURRENCY", code))?,
            None => Currency::default(),
        };

        let cors_allow = get("FIRE_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            listen_addr,
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            max_connections,
            currency,
            cors_allow,
        })
    }
}
