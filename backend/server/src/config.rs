use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redis" => Ok(StoreKind::Redis),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub staff: Vec<String>,
    pub store: StoreKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            staff: Vec::new(),
            store: StoreKind::Memory,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let mut redis_url: String = try_load("REDIS_URL", "redis://127.0.0.1:6379/0")?;
        if let Some(password) = read_secret("REDIS_PASSWORD") {
            redis_url = with_password(&redis_url, &password);
        }

        let staff: String = try_load("LISTLING_STAFF", "")?;

        Ok(Self {
            port: try_load("RUST_PORT", "8080")?,
            redis_url,
            staff: parse_staff(&staff),
            store: try_load("LISTLING_STORE", "redis")?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("invalid {key}: {e}"))
        })
}

/// Optional secret mounted at `/run/secrets/<name>`.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

fn parse_staff(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn with_password(redis_url: &str, password: &str) -> String {
    match redis_url.split_once("://") {
        Some((scheme, rest)) if !rest.contains('@') => format!("{scheme}://:{password}@{rest}"),
        _ => redis_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_staff() {
        assert_eq!(parse_staff(""), Vec::<String>::new());
        assert_eq!(parse_staff("User:a, User:b,"), ["User:a", "User:b"]);
    }

    #[test]
    fn test_with_password() {
        assert_eq!(
            with_password("redis://localhost:6379/0", "hunter2"),
            "redis://:hunter2@localhost:6379/0"
        );
        assert_eq!(
            with_password("redis://:set@localhost", "hunter2"),
            "redis://:set@localhost"
        );
    }

    #[test]
    fn test_store_kind() {
        assert_eq!("memory".parse::<StoreKind>(), Ok(StoreKind::Memory));
        assert!("etcd".parse::<StoreKind>().is_err());
    }
}
