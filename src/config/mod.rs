//! Startup configuration.
//!
//! Inputs come from CLI flags or their environment variables and are
//! resolved once into an immutable [`Config`].

mod loader;
mod types;

pub use loader::{clamp_percent, parse_flag, ConfigError, ProxyArgs};
pub use types::{BackendTarget, Backends, Config, MigrationConfig, Timeouts};
