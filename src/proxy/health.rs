use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Local liveness probe. Never contacts a backend.
pub struct HealthHandler;

impl HealthHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self) -> Response {
        (StatusCode::OK, [(CONTENT_TYPE, "text/plain; charset=utf-8")], "OK").into_response()
    }
}

impl Default for HealthHandler {
    fn default() -> Self {
        Self::new()
    }
}
