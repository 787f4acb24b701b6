//! Dispatcher: binds each inbound request to a backend via the route table.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{Request, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::BackendTarget;
use crate::proxy::health::HealthHandler;
use crate::proxy::upstream::UpstreamClient;
use crate::routing::{Binding, RouteTable};

/// Name of the backend that served a request, attached to the response for logging.
#[derive(Clone, Debug)]
pub struct ForwardedTo(pub String);

#[derive(Clone)]
pub struct RouterEngine {
    table: Arc<RouteTable>,
    upstream: Arc<UpstreamClient>,
    health: Arc<HealthHandler>,
}

impl RouterEngine {
    pub fn new(table: RouteTable, upstream: UpstreamClient) -> Self {
        Self {
            table: Arc::new(table),
            upstream: Arc::new(upstream),
            health: Arc::new(HealthHandler::new()),
        }
    }

    async fn forward(&self, req: Request<Body>, target: &BackendTarget) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let client_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let mut response = match self.upstream.forward(req, target, client_addr).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    %method,
                    %path,
                    backend = %target.name,
                    error = %err,
                    "upstream error"
                );
                err.into_response()
            }
        };
        response
            .extensions_mut()
            .insert(ForwardedTo(target.name.clone()));
        response
    }
}

/// Stable request identity from the `id` query parameter, if any.
///
/// Only the first `id` counts when the key repeats.
pub fn identity_from_uri(uri: &Uri) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == "id")
        .map(|(_, id)| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

async fn dispatch(State(engine): State<RouterEngine>, req: Request<Body>) -> Response {
    let entry = engine.table.lookup(req.uri().path());

    match &entry.binding {
        Binding::Liveness => engine.health.handle(),
        Binding::Static(target) => engine.forward(req, target).await,
        Binding::Migrated(policy) => {
            let identity = identity_from_uri(req.uri());
            let routed = policy.route(identity.as_deref());
            tracing::debug!(
                path = %req.uri().path(),
                rule = %entry.path.pattern(),
                selector = %routed.selector,
                decision = routed.decision.kind(),
                backend = %routed.target.name,
                "migration decision"
            );
            let target = routed.target;
            engine.forward(req, target).await
        }
    }
}

/// One log line per completed request.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let span = tracing::info_span!("request", request_id = %Uuid::new_v4());

    let response = next.run(req).instrument(span.clone()).await;

    let backend = response
        .extensions()
        .get::<ForwardedTo>()
        .map(|f| f.0.as_str())
        .unwrap_or("local");
    span.in_scope(|| {
        tracing::info!(
            %method,
            %path,
            status = response.status().as_u16(),
            backend,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });
    response
}

pub fn build_router(engine: RouterEngine) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(middleware::from_fn(log_requests))
        .with_state(engine)
}
