//! Runtime settings read from the process environment (and `.env` in development).

use std::env;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub icms: IcmsConfig,
}

impl AppConfig {
    /// Loads `.env` if present, then reads `APP_*` and `ICMS_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(&var_or("APP_ENV", "development"));
        let port = var_or("APP_PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            environment,
            server: ServerConfig {
                host: var_or("APP_HOST", "127.0.0.1"),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: var_or("APP_LOG_LEVEL", "info"),
            },
            icms: IcmsConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives, e.g. `info,icms=debug`.
    pub log_level: String,
}

/// Case workflow switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmsConfig {
    /// When false, licences are recorded as sent to CHIEF without building a payload.
    pub send_licence_to_chief: bool,
    /// Row cap for searches that do not pass their own limit.
    pub search_limit: usize,
}

impl Default for IcmsConfig {
    fn default() -> Self {
        Self {
            send_licence_to_chief: false,
            search_limit: 200,
        }
    }
}

impl IcmsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let send_licence_to_chief = match env::var("ICMS_SEND_LICENCE_TO_CHIEF") {
            Ok(value) => parse_switch(&value).ok_or(ConfigError::InvalidBool {
                name: "ICMS_SEND_LICENCE_TO_CHIEF",
                value,
            })?,
            Err(_) => defaults.send_licence_to_chief,
        };

        let search_limit = match env::var("ICMS_SEARCH_LIMIT") {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidLimit { value }),
            },
            Err(_) => defaults.search_limit,
        };

        Ok(Self {
            send_licence_to_chief,
            search_limit,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: AddrParseError,
    },
    #[error("{name} must be true or false, got '{value}'")]
    InvalidBool { name: &'static str, value: String },
    #[error("ICMS_SEARCH_LIMIT must be a positive integer, got '{value}'")]
    InvalidLimit { value: String },
}
