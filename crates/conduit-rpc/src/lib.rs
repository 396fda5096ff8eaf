//! Conduit RPC - HTTP host for an [`InvocationEngine`](conduit_core::InvocationEngine).
//!
//! Serves `POST /rpc` (or a configured path) with the protocol content type
//! and `GET /health`. The binary in this crate hosts the demo `Hello` service
//! from [`greeter`].

pub mod greeter;
pub mod handler;
pub mod server;

pub use server::{router, start_server, AppState, ServerConfig};
