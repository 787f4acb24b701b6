use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::config::Config;
use crate::proxy::router::{build_router, RouterEngine};
use crate::proxy::shutdown::ShutdownManager;
use crate::proxy::upstream::UpstreamClient;
use crate::routing::{RandomSource, RouteTable, SeededRandom};

pub struct ProxyServer {
    pub addr: SocketAddr,
    /// The bound listener, kept alive between try_bind() and run().
    listener: Option<TcpListener>,
    router: RouterEngine,
    header_read_timeout: Duration,
    shutdown: Arc<ShutdownManager>,
}

impl ProxyServer {
    /// Build a server with an OS-seeded random source for id-less requests.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        Self::with_random(config, Arc::new(SeededRandom::new()))
    }

    /// Build a server with a caller-supplied random source.
    pub fn with_random(config: Config, random: Arc<dyn RandomSource>) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(config.timeouts)?;
        let table = RouteTable::from_config(&config, random);
        Ok(Self {
            addr: config.listen_addr,
            listener: None,
            router: RouterEngine::new(table, upstream),
            header_read_timeout: config.timeouts.header_read(),
            shutdown: Arc::new(ShutdownManager::new()),
        })
    }

    /// Bind the configured address. Port 0 picks a free port; the actual
    /// address is returned and stored in `addr`.
    pub async fn try_bind(&mut self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.addr).await?;
        let actual_addr = listener.local_addr()?;
        self.addr = actual_addr;
        self.listener = Some(listener);
        tracing::info!("Proxy bound to {}", actual_addr);
        Ok(actual_addr)
    }

    pub fn handle(&self) -> ProxyHandle {
        ProxyHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Serve until shutdown is signalled.
    ///
    /// Binds first if try_bind() was not called.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.listener.is_none() {
            self.try_bind().await?;
        }
        let listener = self
            .listener
            .take()
            .ok_or("listener missing after bind")?;

        tracing::info!("Starting proxy server on {}", self.addr);

        let app = build_router(self.router.clone());
        let mut http = http1::Builder::new();
        // Slow clients lose the connection if headers do not arrive in time.
        http.timer(TokioTimer::new())
            .header_read_timeout(self.header_read_timeout);

        let graceful = GracefulShutdown::new();
        let shutdown = self.shutdown.clone();
        let stop = shutdown.wait_for_shutdown();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let app = app.clone();
                    let service = service_fn(move |mut req: Request<Incoming>| {
                        req.extensions_mut().insert(ConnectInfo(remote));
                        app.clone().oneshot(req.map(Body::new))
                    });
                    let conn = graceful.watch(http.serve_connection(TokioIo::new(stream), service));
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            tracing::debug!(client = %remote, error = %e, "connection closed with error");
                        }
                    });
                }
                _ = &mut stop => break,
            }
        }

        // Stop accepting, then let in-flight requests finish.
        drop(listener);
        graceful.shutdown().await;

        tracing::info!("Server stopped");
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProxyHandle {
    shutdown: Arc<ShutdownManager>,
}

impl ProxyHandle {
    pub fn shutdown(&self) {
        self.shutdown.signal_shutdown();
    }
}
