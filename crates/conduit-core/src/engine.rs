//! Server-side invocation engine.
//!
//! Turns request bytes into response bytes: decode the envelope, check that
//! the owner is a remote interface, restore arguments, resolve the service,
//! run the access check, dispatch, and strip the result. Every failure after
//! the envelope decodes becomes a failure response; only a request that
//! cannot be decoded fails the exchange itself.
//!
//! # Thread Safety
//!
//! The engine only holds immutable tables behind `Arc` and can be shared
//! freely between request handlers.

use crate::access::{AccessPolicy, GrantTable};
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::failure::{ApplicationFailure, WireFailure};
use crate::optional;
use crate::service::{InterfaceDispatch, RemoteInterface, ServiceResolver, TypedDispatch};
use crate::{ConduitError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Rewrites every outgoing failure, e.g. to hide server internals from
/// untrusted clients.
pub type FailureFilter = Arc<dyn Fn(WireFailure) -> WireFailure + Send + Sync>;

/// Executes encoded requests against registered services.
pub struct InvocationEngine {
    interfaces: HashMap<&'static str, Box<dyn InterfaceDispatch>>,
    resolver: Arc<dyn ServiceResolver>,
    policy: Arc<dyn AccessPolicy>,
    failure_filter: Option<FailureFilter>,
}

impl InvocationEngine {
    pub fn builder() -> InvocationEngineBuilder {
        InvocationEngineBuilder::new()
    }

    /// True if `name` is a registered remote interface.
    pub fn is_remote_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Execute one encoded request and return the encoded response.
    ///
    /// Returns `Err` only when the request cannot be decoded or the response
    /// cannot be encoded.
    pub fn execute(&self, body: &[u8]) -> Result<Vec<u8>> {
        let request = RequestEnvelope::decode(body).map_err(|e| {
            error!("Failed to decode request envelope: {}", e);
            e
        })?;
        let signature = request.signature.to_string();

        let response = match self.dispatch(request) {
            Ok(result) => {
                debug!("{} completed", signature);
                ResponseEnvelope::success(result)
            }
            Err(err) => {
                debug!("{} failed: {}", signature, err);
                let failure = WireFailure::from(&err);
                let failure = match &self.failure_filter {
                    Some(filter) => filter(failure),
                    None => failure,
                };
                ResponseEnvelope::failure(failure)
            }
        };

        response.encode().map_err(|e| {
            error!("Failed to encode response for {}: {}", signature, e);
            e
        })
    }

    fn dispatch(&self, request: RequestEnvelope) -> Result<Value> {
        let RequestEnvelope {
            signature,
            arguments,
        } = request;

        let interface = self.interfaces.get(signature.owner.as_str()).ok_or_else(|| {
            ConduitError::protocol(format!(
                "owner must be a remote interface, got {}",
                signature.owner
            ))
        })?;

        debug!(
            "Dispatching {} ({} args, optionals: {})",
            signature,
            arguments.len(),
            optional::has_optionals(&signature.parameter_types)
        );
        let args = optional::restore_all(arguments, &signature.parameter_types)?;

        let binding = self.resolver.resolve(&signature.owner)?;
        self.policy.check(&binding, &signature)?;

        let return_type = interface
            .descriptor(&signature)
            .map(|m| m.return_type.clone())
            .ok_or_else(|| ConduitError::protocol(format!("no such method: {}", signature)))?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            interface.invoke(&binding, &signature, args)
        }));
        let result = outcome
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!("{} panicked: {}", signature, message);
                Err(ConduitError::Application(ApplicationFailure::service_panic(
                    message,
                )))
            })
            .map_err(|err| match err {
                ConduitError::Application(failure) => {
                    ConduitError::Application(failure.with_frame(format!("at {}", signature)))
                }
                other => other,
            })?;

        optional::strip(result, &return_type)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "service method panicked".to_string()
    }
}

impl fmt::Debug for InvocationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.interfaces.keys().collect();
        names.sort();
        f.debug_struct("InvocationEngine")
            .field("interfaces", &names)
            .field("failure_filter", &self.failure_filter.is_some())
            .finish()
    }
}

/// Builder for [`InvocationEngine`].
///
/// # Example
///
/// ```rust,ignore
/// let engine = InvocationEngine::builder()
///     .interface::<dyn Hello>()
///     .resolver(registry)
///     .access_policy(grants)
///     .build()?;
/// ```
pub struct InvocationEngineBuilder {
    interfaces: HashMap<&'static str, Box<dyn InterfaceDispatch>>,
    resolver: Option<Arc<dyn ServiceResolver>>,
    policy: Option<Arc<dyn AccessPolicy>>,
    failure_filter: Option<FailureFilter>,
}

impl InvocationEngineBuilder {
    pub fn new() -> Self {
        Self {
            interfaces: HashMap::new(),
            resolver: None,
            policy: None,
            failure_filter: None,
        }
    }

    /// Register `I` as a remote interface, using its generated dispatch table.
    pub fn interface<I: RemoteInterface + ?Sized>(self) -> Self {
        self.interface_table::<I>(I::dispatch_table())
    }

    /// Register `I` with an explicit dispatch table.
    pub fn interface_table<I: RemoteInterface + ?Sized>(
        mut self,
        table: crate::service::DispatchTable<I>,
    ) -> Self {
        self.interfaces
            .insert(I::NAME, Box::new(TypedDispatch::new(table)));
        self
    }

    pub fn resolver(mut self, resolver: impl ServiceResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Access policy consulted before every dispatch.
    ///
    /// Default: an empty [`GrantTable`], which denies everything.
    pub fn access_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn failure_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(WireFailure) -> WireFailure + Send + Sync + 'static,
    {
        self.failure_filter = Some(Arc::new(filter));
        self
    }

    pub fn build(self) -> Result<InvocationEngine> {
        let resolver = self
            .resolver
            .ok_or_else(|| ConduitError::protocol("invocation engine needs a service resolver"))?;

        Ok(InvocationEngine {
            interfaces: self.interfaces,
            resolver,
            policy: self
                .policy
                .unwrap_or_else(|| Arc::new(GrantTable::default())),
            failure_filter: self.failure_filter,
        })
    }
}

impl Default for InvocationEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::RemoteAccessGrant;
    use crate::service::{DispatchTable, ServiceBinding, ServiceRegistry};
    use crate::signature::{DeclaredType, MethodDescriptor, MethodSignature};
    use crate::value::CallValue;
    use crate::{ApplicationFailure, WireType};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Echo: Send + Sync + 'static {
        fn echo(&self, text: Option<String>) -> Result<Option<String>>;
    }

    impl RemoteInterface for dyn Echo {
        const NAME: &'static str = "test.Echo";

        fn dispatch_table() -> DispatchTable<Self> {
            let mut table = DispatchTable::new();
            table.insert(
                MethodDescriptor::new(
                    "echo",
                    vec![Option::<String>::declared()],
                    Option::<String>::declared(),
                ),
                |service: &Self, args: Vec<CallValue>| {
                    let arg = args.into_iter().next().unwrap_or(CallValue::Null);
                    service.echo(Option::<String>::from_call_value(arg)?)?.into_call_value()
                },
            );
            table
        }
    }

    #[derive(Default)]
    struct CountingEcho {
        calls: AtomicUsize,
    }

    impl Echo for CountingEcho {
        fn echo(&self, text: Option<String>) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match text.as_deref() {
                Some("boom") => Err(ApplicationFailure::new("test.Boom", "boom").into()),
                Some("panic") => panic!("echo exploded on {}", self.calls.load(Ordering::SeqCst)),
                _ => Ok(text),
            }
        }
    }

    fn engine_with(service: Arc<CountingEcho>, grants: GrantTable) -> InvocationEngine {
        let instance: Arc<dyn Echo> = service.clone();
        let mut registry = ServiceRegistry::new();
        registry.bind(ServiceBinding::new::<dyn Echo, _>(service, instance));

        InvocationEngine::builder()
            .interface::<dyn Echo>()
            .resolver(registry)
            .access_policy(grants)
            .build()
            .unwrap()
    }

    fn granted() -> GrantTable {
        let mut grants = GrantTable::new();
        grants.grant::<CountingEcho>(RemoteAccessGrant::all());
        grants
    }

    fn request(owner: &str, name: &str, args: Vec<Value>) -> Vec<u8> {
        RequestEnvelope::new(
            MethodSignature::new(owner, name, vec![DeclaredType::optional("string")]),
            args,
        )
        .encode()
        .unwrap()
    }

    fn respond(engine: &InvocationEngine, body: &[u8]) -> ResponseEnvelope {
        ResponseEnvelope::decode(&engine.execute(body).unwrap()).unwrap()
    }

    #[test]
    fn test_successful_dispatch() {
        let engine = engine_with(Arc::default(), granted());

        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("Bob")]));
        assert_eq!(response, ResponseEnvelope::success(json!("Bob")));

        let response = respond(&engine, &request("test.Echo", "echo", vec![Value::Null]));
        assert_eq!(response, ResponseEnvelope::success(Value::Null));
    }

    #[test]
    fn test_unknown_owner_is_protocol_failure() {
        let engine = engine_with(Arc::default(), granted());
        let response = respond(&engine, &request("test.NotRemote", "echo", vec![json!("x")]));

        let failure = response.failure.unwrap();
        assert_eq!(failure.failure_type, WireFailure::PROTOCOL_ERROR);
        assert!(failure.message.contains("owner must be a remote interface"));
    }

    #[test]
    fn test_unknown_method_is_protocol_failure() {
        let engine = engine_with(Arc::default(), granted());
        let response = respond(&engine, &request("test.Echo", "shout", vec![json!("x")]));

        let failure = response.failure.unwrap();
        assert_eq!(failure.failure_type, WireFailure::PROTOCOL_ERROR);
        assert!(failure.message.contains("no such method"));
    }

    #[test]
    fn test_arity_mismatch_is_protocol_failure() {
        let engine = engine_with(Arc::default(), granted());
        let response = respond(&engine, &request("test.Echo", "echo", vec![]));
        assert_eq!(
            response.failure.unwrap().failure_type,
            WireFailure::PROTOCOL_ERROR
        );
    }

    #[test]
    fn test_denied_call_never_runs() {
        let service = Arc::new(CountingEcho::default());
        let engine = engine_with(service.clone(), GrantTable::new());

        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("Bob")]));
        assert_eq!(
            response.failure.unwrap().failure_type,
            WireFailure::ACCESS_DENIED
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_application_failure_gets_frame() {
        let engine = engine_with(Arc::default(), granted());
        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("boom")]));

        let failure = response.failure.unwrap();
        assert_eq!(failure.failure_type, "test.Boom");
        assert_eq!(failure.stack_summary, vec!["at test.Echo#echo".to_string()]);
        assert!(response.result.is_null());
    }

    #[test]
    fn test_panicking_service_becomes_failure_response() {
        let service = Arc::new(CountingEcho::default());
        let engine = engine_with(service.clone(), granted());

        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("panic")]));
        assert!(response.result.is_null());
        let failure = response.failure.unwrap();
        assert_eq!(failure.failure_type, WireFailure::SERVICE_PANIC);
        assert_eq!(failure.message, "echo exploded on 1");
        assert_eq!(failure.stack_summary, vec!["at test.Echo#echo".to_string()]);

        // the engine keeps serving after a panic
        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("Bob")]));
        assert_eq!(response, ResponseEnvelope::success(json!("Bob")));
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_message_from_payload() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u32), "service method panicked");
    }

    #[test]
    fn test_failure_filter_rewrites_failures() {
        let service = Arc::new(CountingEcho::default());
        let instance: Arc<dyn Echo> = service.clone();
        let mut registry = ServiceRegistry::new();
        registry.bind(ServiceBinding::new::<dyn Echo, _>(service, instance));

        let engine = InvocationEngine::builder()
            .interface::<dyn Echo>()
            .resolver(registry)
            .access_policy(granted())
            .failure_filter(|failure| WireFailure::new(failure.failure_type, "hidden"))
            .build()
            .unwrap();

        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("boom")]));
        let failure = response.failure.unwrap();
        assert_eq!(failure.message, "hidden");
        assert!(failure.stack_summary.is_empty());
    }

    #[test]
    fn test_null_optional_result_is_null_reference() {
        let service = Arc::new(CountingEcho::default());
        let instance: Arc<dyn Echo> = service.clone();
        let mut registry = ServiceRegistry::new();
        registry.bind(ServiceBinding::new::<dyn Echo, _>(service, instance));

        let mut table = DispatchTable::<dyn Echo>::new();
        table.insert(
            MethodDescriptor::new(
                "echo",
                vec![DeclaredType::optional("string")],
                DeclaredType::optional("string"),
            ),
            |_, _| Ok(CallValue::Null),
        );

        let engine = InvocationEngine::builder()
            .interface_table::<dyn Echo>(table)
            .resolver(registry)
            .access_policy(granted())
            .build()
            .unwrap();

        let response = respond(&engine, &request("test.Echo", "echo", vec![json!("Bob")]));
        assert_eq!(
            response.failure.unwrap().failure_type,
            WireFailure::NULL_REFERENCE
        );
    }

    #[test]
    fn test_undecodable_request_fails_exchange() {
        let engine = engine_with(Arc::default(), granted());
        assert!(matches!(
            engine.execute(b"{not json"),
            Err(ConduitError::Codec { .. })
        ));
    }

    #[test]
    fn test_build_requires_resolver() {
        assert!(InvocationEngine::builder().build().is_err());
    }
}
