//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use strangler_proxy::config::{Config, ProxyArgs};
use strangler_proxy::proxy::{ProxyHandle, ProxyServer};
use strangler_proxy::routing::RandomSource;

/// Resolve a config pointing at the given backends, listening on a free loopback port.
pub fn test_config(legacy: &str, movies: &str, events: &str, gradual: &str, percent: &str) -> Config {
    let args = ProxyArgs {
        port: "0".to_string(),
        monolith_url: legacy.to_string(),
        movies_service_url: movies.to_string(),
        events_service_url: events.to_string(),
        gradual_migration: gradual.to_string(),
        movies_migration_percent: percent.to_string(),
        connect_timeout_secs: 1,
        request_timeout_secs: 2,
        header_read_timeout_secs: 1,
    };
    let mut config = Config::resolve(&args).expect("test config should resolve");
    config.listen_addr = "127.0.0.1:0".parse().unwrap();
    config
}

/// A running proxy. Shuts down when dropped.
pub struct RunningProxy {
    pub addr: SocketAddr,
    handle: ProxyHandle,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

pub async fn start_proxy(config: Config) -> RunningProxy {
    let server = ProxyServer::new(config).expect("Failed to create proxy server");
    launch(server).await
}

pub async fn start_proxy_with_random(config: Config, random: Arc<dyn RandomSource>) -> RunningProxy {
    let server = ProxyServer::with_random(config, random).expect("Failed to create proxy server");
    launch(server).await
}

async fn launch(mut server: ProxyServer) -> RunningProxy {
    // Bind before spawning so the port is ready when we return.
    let addr = server.try_bind().await.expect("Failed to bind");
    let handle = server.handle();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    assert!(wait_for_server(addr, Duration::from_secs(2)).await);
    RunningProxy { addr, handle }
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// An address nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
