use anyhow::Context;
use clap::Parser;

use strangler_proxy::config::{Config, ProxyArgs};
use strangler_proxy::proxy::{init_tracing, ProxyServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = ProxyArgs::parse();
    let config = Config::resolve(&args).context("invalid configuration")?;

    tracing::info!(
        port = config.listen_addr.port(),
        gradual = config.migration.enabled,
        percent = config.migration.percent,
        monolith = %config.backends.legacy.base_url,
        movies = %config.backends.movies.base_url,
        events = %config.backends.events.base_url,
        "proxy-service starting"
    );

    let mut server = ProxyServer::new(config).context("failed to build upstream client")?;
    server.try_bind().await.context("failed to bind listener")?;
    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("proxy server failed")?;

    Ok(())
}
