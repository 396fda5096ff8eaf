//! Conduit Core - remote interface invocation.
//!
//! A caller invokes methods on a remote service through a local [`Stub`]
//! implementing the same interface. Each call is marshaled into a request
//! envelope, carried by a [`Transport`] in one round trip, executed by the
//! [`InvocationEngine`] on the server, and the result or the recovered failure
//! comes back.
//!
//! This crate has no HTTP server; see `conduit-rpc` for hosting an engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_core::{ClientFactory, GrantTable, InvocationEngine, RemoteAccessGrant};
//! use conduit_core::{ServiceRegistry};
//! use std::sync::Arc;
//!
//! conduit_core::remote_interface! {
//!     pub trait Hello as "example.Hello" {
//!         fn hi(&self, name: String) -> String;
//!     }
//! }
//!
//! struct HelloImpl;
//!
//! impl Hello for HelloImpl {
//!     fn hi(&self, name: String) -> conduit_core::Result<String> {
//!         Ok(format!("Hi, {}", name))
//!     }
//! }
//!
//! let mut registry = ServiceRegistry::new();
//! registry.bind(<dyn Hello>::binding(Arc::new(HelloImpl)));
//! let mut grants = GrantTable::new();
//! grants.grant::<HelloImpl>(RemoteAccessGrant::all());
//!
//! let engine = InvocationEngine::builder()
//!     .interface::<dyn Hello>()
//!     .resolver(registry)
//!     .access_policy(grants)
//!     .build()?;
//!
//! let hello = ClientFactory::loopback(Arc::new(engine)).create::<dyn Hello>();
//! assert_eq!(hello.hi("Bob".into())?, "Hi, Bob");
//! ```

pub mod access;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod failure;
pub mod optional;
pub mod service;
pub mod signature;
pub mod stub;
pub mod transport;
pub mod value;

mod macros;

// Re-export commonly used types
pub use access::{AccessPolicy, GrantTable, RemoteAccessGrant};
pub use config::{NetworkConfig, ProtocolConfig};
pub use engine::{FailureFilter, InvocationEngine, InvocationEngineBuilder};
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use error::{ConduitError, Result};
pub use failure::{
    ApplicationFailure, FailureRegistry, FailureType, OpaqueRemoteFailure, RemoteFailure,
    WireFailure,
};
pub use service::{
    DispatchTable, Handler, RemoteInterface, ServiceBinding, ServiceRegistry, ServiceResolver,
};
pub use signature::{DeclaredType, MethodDescriptor, MethodSignature};
pub use stub::{ClientFactory, Stub};
pub use transport::{HttpTransport, LoopbackTransport, Transport};
pub use value::{CallValue, WireType};
