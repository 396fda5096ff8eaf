//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_invoke};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use conduit_core::{InvocationEngine, ProtocolConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Server limits and defaults.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    /// Requests in flight before new ones wait.
    pub const MAX_CONCURRENT_REQUESTS: usize = 64;
}

/// Application state shared across handlers.
pub struct AppState {
    pub engine: Arc<InvocationEngine>,
}

/// Build the router serving `engine` at `rpc_path`.
pub fn router(engine: Arc<InvocationEngine>, rpc_path: &str) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route(ProtocolConfig::HEALTH_PATH, get(handle_health))
        .route(rpc_path, post(handle_invoke))
        .layer(DefaultBodyLimit::max(ProtocolConfig::MAX_BODY_SIZE))
        .layer(ConcurrencyLimitLayer::new(ServerConfig::MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    engine: Arc<InvocationEngine>,
    host: &str,
    port: u16,
    rpc_path: &str,
) -> anyhow::Result<SocketAddr> {
    let app = router(engine, rpc_path);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeter;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{header, StatusCode};
    use axum::response::Response;
    use tower::Service;

    async fn send(app: &mut Router, request: Request) -> Response {
        std::future::poll_fn(|cx| <Router as Service<Request>>::poll_ready(app, cx))
            .await
            .unwrap();
        app.call(request).await.unwrap()
    }

    fn invoke_request(body: impl Into<Body>) -> Request {
        Request::builder()
            .method("POST")
            .uri(ProtocolConfig::RPC_PATH)
            .header(header::CONTENT_TYPE, ProtocolConfig::CONTENT_TYPE)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_server_starts() {
        let engine = Arc::new(greeter::build_engine().unwrap());
        let addr = start_server(engine, "127.0.0.1", 0, ProtocolConfig::RPC_PATH)
            .await
            .unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_bad_host_is_rejected() {
        let engine = Arc::new(greeter::build_engine().unwrap());
        assert!(start_server(engine, "not a host", 0, ProtocolConfig::RPC_PATH)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let engine = Arc::new(greeter::build_engine().unwrap());
        let mut app = router(engine, ProtocolConfig::RPC_PATH);

        let body = vec![b' '; ProtocolConfig::MAX_BODY_SIZE + 1];
        let response = send(&mut app, invoke_request(body)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let engine = Arc::new(greeter::build_engine().unwrap());
        let mut app = router(engine, ProtocolConfig::RPC_PATH);

        let response = send(&mut app, invoke_request("{not an envelope")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
