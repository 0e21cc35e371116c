use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub http_port: u16,
    pub rpc_port: u16,
    pub rpc_worker_pool: usize,
    pub db_max_connections: u32,
    pub db_statement_timeout_ms: u64,
    pub log_level: String,
}

pub fn load_config() -> Result<Config> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let http_port = parsed_from_env("PORT")?.unwrap_or(8087);
    let rpc_port = parsed_from_env("RPC_PORT")?.unwrap_or(9087);
    let rpc_worker_pool = parsed_from_env::<usize>("RPC_WORKER_POOL")?.unwrap_or(64).max(1);
    let db_max_connections = parsed_from_env::<u32>("DB_MAX_CONNECTIONS")?.unwrap_or(10).max(1);
    let db_statement_timeout_ms =
        parsed_from_env::<u64>("DB_STATEMENT_TIMEOUT_MS")?.unwrap_or(5_000);
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    Ok(Config {
        database_url,
        host,
        http_port,
        rpc_port,
        rpc_worker_pool,
        db_max_connections,
        db_statement_timeout_ms,
        log_level,
    })
}

fn parsed_from_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .ok()
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Failed to parse {key}='{value}'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_from_env_accepts_valid_numbers() {
        env::set_var("TEST_PARSE_PORT", "9099");
        assert_eq!(parsed_from_env::<u16>("TEST_PARSE_PORT").unwrap(), Some(9099));
    }

    #[test]
    fn parsed_from_env_rejects_garbage() {
        env::set_var("TEST_PARSE_BAD", "not-a-number");
        assert!(parsed_from_env::<u16>("TEST_PARSE_BAD").is_err());
    }

    #[test]
    fn parsed_from_env_absent_is_none() {
        env::remove_var("TEST_PARSE_ABSENT");
        assert_eq!(parsed_from_env::<u64>("TEST_PARSE_ABSENT").unwrap(), None);
    }
}
