//! HTTP surface of the proxy: dispatcher, forwarding unit, and server.

pub mod error;
pub mod health;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod tracing;
pub mod upstream;

pub use error::ProxyError;
pub use server::{ProxyHandle, ProxyServer};
pub use self::tracing::init_tracing;
