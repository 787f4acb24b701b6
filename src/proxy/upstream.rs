//! Forwarding unit: sends an inbound request to a backend and streams the
//! answer back.

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::http::header::{HeaderName, CONNECTION, HOST};
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use futures_core::Stream;
use reqwest::Client;

use crate::config::{BackendTarget, Timeouts};
use crate::proxy::error::ProxyError;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that only apply to a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Shared HTTP client for all backends. Connections are pooled per host.
pub struct UpstreamClient {
    client: Client,
    timeouts: Timeouts,
}

impl UpstreamClient {
    pub fn new(timeouts: Timeouts) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.request())
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self { client, timeouts })
    }

    /// Forward `req` to `target`.
    ///
    /// Method, path, query, headers and body are preserved; only the
    /// destination changes. Responses of any status are passed through as-is.
    /// Transport failures come back as [`ProxyError`] and are never retried.
    pub async fn forward(
        &self,
        req: Request<Body>,
        target: &BackendTarget,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ProxyError> {
        let (parts, body) = req.into_parts();
        let url = target.upstream_url(parts.uri.path(), parts.uri.query());

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(HOST);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut headers, addr);
        }

        let mut builder = self.client.request(parts.method, url).headers(headers);
        // Bodiless requests stay bodiless instead of turning into empty chunked uploads.
        if body.size_hint().exact() != Some(0) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_resp = builder.send().await.map_err(|e| self.classify(target, e))?;

        let status = upstream_resp.status();
        let mut response_headers = upstream_resp.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let stream = ObservedBody::new(upstream_resp.bytes_stream(), target.name.clone());
        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }

    fn classify(&self, target: &BackendTarget, err: reqwest::Error) -> ProxyError {
        if err.is_timeout() {
            self.timed_out(target, err.is_connect())
        } else {
            ProxyError::Connect {
                backend: target.name.clone(),
                source: err,
            }
        }
    }

    /// reqwest flags dial timeouts as both connect and timeout errors.
    fn timed_out(&self, target: &BackendTarget, while_connecting: bool) -> ProxyError {
        let (stage, duration) = if while_connecting {
            ("connect", self.timeouts.connect_timeout_seconds)
        } else {
            ("request", self.timeouts.request_timeout_seconds)
        };
        ProxyError::Timeout {
            backend: target.name.clone(),
            stage,
            duration,
        }
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append the caller's IP to `X-Forwarded-For`, creating it if absent.
pub fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        ip
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Response body stream that logs when the backend breaks off mid-body.
///
/// Headers are already on the wire at that point, so the error can only end
/// the stream.
struct ObservedBody {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    backend: String,
    bytes: u64,
}

impl ObservedBody {
    fn new<S>(inner: S, backend: String) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            inner: Box::pin(inner),
            backend,
            bytes: 0,
        }
    }
}

impl Stream for ObservedBody {
    type Item = Result<Bytes, reqwest::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                tracing::warn!(
                    backend = %self.backend,
                    bytes_sent = self.bytes,
                    error = %err,
                    "upstream body stream failed"
                );
                Poll::Ready(Some(Err(err)))
            }
            other => other,
        }
    }
}
