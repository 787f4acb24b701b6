use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;

/// Root configuration container.
///
/// Resolved once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the proxy listens on.
    pub listen_addr: SocketAddr,
    pub backends: Backends,
    pub migration: MigrationConfig,
    pub timeouts: Timeouts,
}

/// The three logical backends the proxy knows about.
#[derive(Debug, Clone)]
pub struct Backends {
    /// Legacy monolith. Also the default for unmatched paths.
    pub legacy: BackendTarget,
    /// Extracted movies service.
    pub movies: BackendTarget,
    /// Events service.
    pub events: BackendTarget,
}

/// An upstream HTTP service requests can be forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// Short name used in logs (e.g., "monolith", "movies").
    pub name: String,
    /// Base URL (scheme, host, port and optional path prefix).
    pub base_url: Url,
}

impl BackendTarget {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
        }
    }

    /// Build the upstream URL for an incoming path and query.
    ///
    /// The base URL path is joined with the request path using exactly one
    /// slash; the query string is carried over untouched.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        let origin = self.base_url.origin().ascii_serialization();
        let base_path = self.base_url.path();
        let joined = match (base_path.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", base_path, &path[1..]),
            (false, false) => format!("{}/{}", base_path, path),
            _ => format!("{}{}", base_path, path),
        };

        match query {
            Some(q) => format!("{}{}?{}", origin, joined, q),
            None => format!("{}{}", origin, joined),
        }
    }
}

/// Gradual migration settings for one path group.
///
/// `percent` is always within `0..=100`; the loader clamps raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationConfig {
    pub enabled: bool,
    pub percent: u8,
}

impl MigrationConfig {
    pub fn new(enabled: bool, percent: u8) -> Self {
        Self {
            enabled,
            percent: percent.min(100),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            percent: 0,
        }
    }
}

/// Timeouts for inbound connections and for the forwarding unit.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Dial timeout in seconds (default: 3).
    pub connect_timeout_seconds: u64,
    /// Overall per-request timeout in seconds (default: 30).
    pub request_timeout_seconds: u64,
    /// Time a client gets to send its request headers (default: 5).
    pub header_read_timeout_seconds: u64,
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn header_read(&self) -> Duration {
        Duration::from_secs(self.header_read_timeout_seconds)
    }
}

fn default_connect_timeout() -> u64 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_header_read_timeout() -> u64 {
    5
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
            header_read_timeout_seconds: default_header_read_timeout(),
        }
    }
}
