//! Traffic-splitting reverse proxy for strangler-fig migrations.
//!
//! Sits in front of a legacy monolith and newer extracted services and
//! decides per request which backend serves it: static path bindings,
//! percentage-based migration with deterministic bucketing by request id,
//! and a random split for requests without one.

pub mod config;
pub mod proxy;
pub mod routing;
