//! Error types and response handling for the proxy server.
//!
//! Every forwarding failure is terminal for its own request only and is
//! turned into a small JSON body for the caller.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Body returned to callers when a backend cannot be reached.
pub const UPSTREAM_UNAVAILABLE: &str = "upstream unavailable";

/// Errors that can occur while forwarding a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Could not connect to, or talk to, the backend
    #[error("Connection to '{backend}' failed: {source}")]
    Connect {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// Backend did not answer in time. `stage` is "connect" or "request".
    #[error("Request to '{backend}' timed out during {stage} after {duration}s")]
    Timeout {
        backend: String,
        stage: &'static str,
        duration: u64,
    },
}

impl ProxyError {
    /// Map error variant to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Connect { .. } | ProxyError::Timeout { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message exposed to the caller. Upstream details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        UPSTREAM_UNAVAILABLE
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Build a `{"error": "..."}` JSON response.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
    };
    let json = serde_json::to_string(&body).unwrap_or_else(|_| r#"{"error":"internal"}"#.to_string());

    let mut response = Response::new(Body::from(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        json_error(self.status_code(), self.public_message())
    }
}
