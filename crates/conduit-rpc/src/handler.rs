//! HTTP request handlers.

use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use conduit_core::transport::check_content_type;
use conduit_core::ProtocolConfig;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Invocation endpoint.
///
/// The content type is checked before any of the body is read. A body over
/// the router's limit is answered with 413, any other read failure with 400.
/// The engine runs on the blocking pool since service methods are synchronous.
pub async fn handle_invoke(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let headers = request.headers();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if let Err(e) = check_content_type(content_type) {
        warn!("Rejected request: {}", e);
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()).into_response();
    }

    let interface = headers
        .get(ProtocolConfig::INTERFACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let bytes = match Bytes::from_request(request, &()).await {
        Ok(bytes) => bytes,
        Err(rejection) => {
            warn!(
                "Failed to read request body for {} ({}): {}",
                interface,
                rejection.status(),
                rejection.body_text()
            );
            return rejection.into_response();
        }
    };
    debug!("Invocation for {} ({} bytes)", interface, bytes.len());

    let engine = state.engine.clone();
    match tokio::task::spawn_blocking(move || engine.execute(&bytes)).await {
        Ok(Ok(response)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, ProtocolConfig::CONTENT_TYPE)],
            response,
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!("Bad request for {}: {}", interface, e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            error!("Invocation task for {} failed: {}", interface, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "invocation failed").into_response()
        }
    }
}
