use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Logs failed responses from the `ErrorReport` the handler attached, tagged
/// with the request id.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone());
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let elapsed_ms = start.elapsed().as_millis();
    let report = response
        .extensions_mut()
        .remove::<ErrorReport>()
        .unwrap_or_else(|| {
            ErrorReport::from_message("unknown", status, "no diagnostic available")
        })
        .with_request_id(request_id);

    if status.is_server_error() {
        error!(
            target: "mondrian::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            source = report.source,
            detail = report.detail(),
            chain = ?report.messages,
            request_id = report.request_id.as_deref(),
            "request failed",
        );
    } else {
        warn!(
            target: "mondrian::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            source = report.source,
            detail = report.detail(),
            request_id = report.request_id.as_deref(),
            "client request error",
        );
    }

    response
}
