//! Server configuration read from the environment.
//!
//! # Environment Variables
//!
//! - `IEBANK_DB_PATH`: SQLite database file, or `:memory:` (default: `iebank.db`)
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)
//! - `LOG_FORMAT`: `text` (default) | `json`
//! - `RUST_LOG`: Logging filter (e.g., `debug`, `iebank_api=debug`)
//!
//! A `.env` file in the working directory is loaded first when present.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::logging::LogFormat;

pub const DEFAULT_DB_PATH: &str = "iebank.db";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub db_path: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: DEFAULT_DB_PATH.to_string(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Self {
        // Missing .env is the normal case
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unparsable values fall back to defaults
    ///
    /// Logging is not initialised yet when this runs, so problems are
    /// collected as warnings on stderr.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();

        let db_path = lookup("IEBANK_DB_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.db_path);

        let host = match lookup("HOST") {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                eprintln!("Warning: HOST={} is not an IP address, using {}", value, defaults.host);
                defaults.host
            }),
            None => defaults.host,
        };

        let port = match lookup("PORT") {
            Some(value) => match value.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    eprintln!("Warning: PORT={} is invalid, using {}", value, defaults.port);
                    defaults.port
                }
            },
            None => defaults.port,
        };

        let log_format = lookup("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(defaults.log_format);

        ServerConfig {
            db_path,
            host,
            port,
            log_format,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
