use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use reqwest::Url;
use thiserror::Error;

use crate::config::types::{BackendTarget, Backends, Config, MigrationConfig, Timeouts};

/// Errors that can occur when resolving configuration.
///
/// All of these are fatal: a binding that cannot be built can never serve.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL for {key} '{value}': {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported URL for {key} '{value}': {reason}")]
    UnsupportedUrl {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid port '{value}'")]
    InvalidPort { value: String },
}

const DEFAULT_PORT: &str = "8000";
const DEFAULT_MONOLITH_URL: &str = "http://monolith:8080";
const DEFAULT_MOVIES_SERVICE_URL: &str = "http://movies-service:8081";
const DEFAULT_EVENTS_SERVICE_URL: &str = "http://events-service:8082";
const DEFAULT_GRADUAL_MIGRATION: &str = "true";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEADER_READ_TIMEOUT_SECS: u64 = 5;

/// Startup inputs. Each flag can also be supplied through its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "strangler-proxy", about = "Traffic-splitting reverse proxy for strangler-fig migrations")]
pub struct ProxyArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = DEFAULT_PORT)]
    pub port: String,

    /// Legacy monolith base URL.
    #[arg(long, env = "MONOLITH_URL", default_value = DEFAULT_MONOLITH_URL)]
    pub monolith_url: String,

    /// Movies service base URL.
    #[arg(long, env = "MOVIES_SERVICE_URL", default_value = DEFAULT_MOVIES_SERVICE_URL)]
    pub movies_service_url: String,

    /// Events service base URL.
    #[arg(long, env = "EVENTS_SERVICE_URL", default_value = DEFAULT_EVENTS_SERVICE_URL)]
    pub events_service_url: String,

    /// Enable percentage-based migration of /api/movies ("true" to enable).
    #[arg(long, env = "GRADUAL_MIGRATION", default_value = DEFAULT_GRADUAL_MIGRATION)]
    pub gradual_migration: String,

    /// Share of /api/movies traffic sent to the movies service, 0-100.
    #[arg(long, env = "MOVIES_MIGRATION_PERCENT", default_value = "0")]
    pub movies_migration_percent: String,

    /// Upstream dial timeout in seconds.
    #[arg(long, env = "UPSTREAM_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,

    /// Overall upstream request timeout in seconds.
    #[arg(long, env = "UPSTREAM_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Seconds a client has to finish sending request headers.
    #[arg(long, env = "HEADER_READ_TIMEOUT_SECS", default_value_t = DEFAULT_HEADER_READ_TIMEOUT_SECS)]
    pub header_read_timeout_secs: u64,
}

impl Default for ProxyArgs {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            monolith_url: DEFAULT_MONOLITH_URL.to_string(),
            movies_service_url: DEFAULT_MOVIES_SERVICE_URL.to_string(),
            events_service_url: DEFAULT_EVENTS_SERVICE_URL.to_string(),
            gradual_migration: DEFAULT_GRADUAL_MIGRATION.to_string(),
            movies_migration_percent: "0".to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            header_read_timeout_secs: DEFAULT_HEADER_READ_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Resolve raw startup inputs into a validated configuration.
    ///
    /// - Empty values (after trimming) fall back to the defaults.
    /// - Percent is clamped to `0..=100`; unparsable input becomes 0.
    /// - Backend URLs must be absolute `http`/`https` URLs with a host.
    pub fn resolve(args: &ProxyArgs) -> Result<Self, ConfigError> {
        let port_raw = or_default(&args.port, DEFAULT_PORT);
        let port: u16 = port_raw.parse().map_err(|_| ConfigError::InvalidPort {
            value: port_raw.to_string(),
        })?;

        let backends = Backends {
            legacy: BackendTarget::new(
                "monolith",
                parse_backend_url("MONOLITH_URL", or_default(&args.monolith_url, DEFAULT_MONOLITH_URL))?,
            ),
            movies: BackendTarget::new(
                "movies",
                parse_backend_url(
                    "MOVIES_SERVICE_URL",
                    or_default(&args.movies_service_url, DEFAULT_MOVIES_SERVICE_URL),
                )?,
            ),
            events: BackendTarget::new(
                "events",
                parse_backend_url(
                    "EVENTS_SERVICE_URL",
                    or_default(&args.events_service_url, DEFAULT_EVENTS_SERVICE_URL),
                )?,
            ),
        };

        let migration = MigrationConfig::new(
            parse_flag(or_default(&args.gradual_migration, DEFAULT_GRADUAL_MIGRATION)),
            clamp_percent(&args.movies_migration_percent),
        );

        Ok(Config {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            backends,
            migration,
            timeouts: Timeouts {
                connect_timeout_seconds: args.connect_timeout_secs,
                request_timeout_seconds: args.request_timeout_secs,
                header_read_timeout_seconds: args.header_read_timeout_secs,
            },
        })
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}

/// Boolean-like flag: only a case-insensitive "true" enables it.
pub fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Parse a percentage, clamping to the nearest bound.
pub fn clamp_percent(raw: &str) -> u8 {
    match raw.trim().parse::<i64>() {
        Ok(n) => n.clamp(0, 100) as u8,
        Err(_) => 0,
    }
}

fn parse_backend_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedUrl {
            key,
            value: raw.to_string(),
            reason: "scheme must be http or https",
        });
    }
    if url.host_str().is_none() {
        return Err(ConfigError::UnsupportedUrl {
            key,
            value: raw.to_string(),
            reason: "missing host",
        });
    }

    Ok(url)
}
