//! Runtime configuration
//!
//! Read from the command line and environment:
//! - first CLI argument: bind address (overrides `HOST`/`PORT`)
//! - `HOST` (default `0.0.0.0`), `PORT` (default `8080`)
//! - `QUERY_TIMEOUT_MS`: room state query timeout (default 1000)

use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::router::DEFAULT_QUERY_TIMEOUT;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Timeout for room state queries
    pub query_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from the process arguments and environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(env::args().nth(1), |name| env::var(name).ok())
    }

    /// Build configuration from an optional address argument and a variable lookup
    pub fn from_lookup<F>(addr_arg: Option<String>, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = match addr_arg {
            Some(addr) => addr,
            None => {
                let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = match lookup("PORT") {
                    Some(port) => port
                        .parse::<u16>()
                        .map_err(|e| AppError::InvalidConfig(format!("PORT '{}': {}", port, e)))?,
                    None => DEFAULT_PORT,
                };
                format!("{}:{}", host, port)
            }
        };

        let query_timeout = match lookup("QUERY_TIMEOUT_MS") {
            Some(ms) => {
                let ms = ms.parse::<u64>().map_err(|e| {
                    AppError::InvalidConfig(format!("QUERY_TIMEOUT_MS '{}': {}", ms, e))
                })?;
                if ms == 0 {
                    return Err(AppError::InvalidConfig(
                        "QUERY_TIMEOUT_MS must be positive".to_string(),
                    ));
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_QUERY_TIMEOUT,
        };

        Ok(Self {
            bind_addr,
            query_timeout,
        })
    }
}
