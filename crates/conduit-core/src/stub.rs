//! Client-side stubs.
//!
//! A [`Stub<dyn I>`](Stub) stands in for a remote service implementing `I`.
//! Each call is marshaled into a request envelope, posted once through the
//! transport, and the response is decoded with failure recovery. Local
//! operations such as `Display` and `Clone` never cross the wire.

use crate::config::ProtocolConfig;
use crate::engine::InvocationEngine;
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::failure::FailureRegistry;
use crate::optional;
use crate::service::RemoteInterface;
use crate::signature::MethodDescriptor;
use crate::transport::{HttpTransport, LoopbackTransport, Transport};
use crate::value::CallValue;
use crate::{ConduitError, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Local stand-in for a remote service implementing `I`.
pub struct Stub<I: ?Sized> {
    transport: Arc<dyn Transport>,
    failures: Arc<FailureRegistry>,
    _interface: PhantomData<I>,
}

impl<I: RemoteInterface + ?Sized> Stub<I> {
    pub fn new(transport: Arc<dyn Transport>, failures: Arc<FailureRegistry>) -> Self {
        Self {
            transport,
            failures,
            _interface: PhantomData,
        }
    }

    /// Invoke `method` with already converted arguments.
    ///
    /// Used by generated interface impls; also usable directly for dynamic
    /// calls. A failure raised on the remote end comes back as
    /// [`ConduitError::Remote`]; anything else is a local error.
    pub fn call(&self, method: &MethodDescriptor, args: Vec<CallValue>) -> Result<CallValue> {
        let signature = method.signature(I::NAME);
        let arguments = optional::strip_all(args, &signature.parameter_types)?;

        debug!("Invoking {} remotely", signature);
        let request = RequestEnvelope::new(signature, arguments).encode()?;
        let bytes = self
            .transport
            .post(ProtocolConfig::CONTENT_TYPE, request, I::NAME)?;

        let response = ResponseEnvelope::decode(&bytes)?;
        if let Some(wire) = response.failure {
            let failure = self.failures.recover(wire)?;
            return Err(ConduitError::Remote(failure));
        }

        Ok(optional::restore(response.result, &method.return_type))
    }

    pub fn interface_name(&self) -> &'static str {
        I::NAME
    }
}

impl<I: ?Sized> Clone for Stub<I> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            failures: self.failures.clone(),
            _interface: PhantomData,
        }
    }
}

impl<I: RemoteInterface + ?Sized> fmt::Display for Stub<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stub({}, {})", self.transport, I::NAME)
    }
}

impl<I: RemoteInterface + ?Sized> fmt::Debug for Stub<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("interface", &I::NAME)
            .field("transport", &self.transport.to_string())
            .finish()
    }
}

/// Creates stubs sharing one transport and failure registry.
///
/// # Example
///
/// ```rust,ignore
/// let hello = ClientFactory::http("http://127.0.0.1:8080/rpc")?.create::<dyn Hello>();
/// assert_eq!(hello.hi("Bob".into())?, "Hi, Bob");
/// ```
#[derive(Clone)]
pub struct ClientFactory {
    transport: Arc<dyn Transport>,
    failures: Arc<FailureRegistry>,
}

impl ClientFactory {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            failures: Arc::new(FailureRegistry::default()),
        }
    }

    /// Factory posting to `url` with the default HTTP client settings.
    pub fn http(url: impl Into<String>) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(url)?))
    }

    /// Factory calling an engine in this process.
    pub fn loopback(engine: Arc<InvocationEngine>) -> Self {
        Self::new(LoopbackTransport::new(engine))
    }

    /// Failure types this client can recover by type. Anything else arrives
    /// opaque.
    pub fn with_failure_registry(mut self, failures: FailureRegistry) -> Self {
        self.failures = Arc::new(failures);
        self
    }

    pub fn create<I: RemoteInterface + ?Sized>(&self) -> Stub<I> {
        Stub::new(self.transport.clone(), self.failures.clone())
    }
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("transport", &self.transport.to_string())
            .field("failures", &self.failures)
            .finish()
    }
}
