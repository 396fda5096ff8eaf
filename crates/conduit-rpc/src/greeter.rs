//! Demo `Hello` service served by the binary.

use conduit_core::{
    CallValue, ConduitError, DeclaredType, FailureRegistry, FailureType, GrantTable,
    InvocationEngine, MethodDescriptor, RemoteAccessGrant, RemoteInterface, Result,
    ServiceRegistry,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

conduit_core::remote_interface! {
    /// Greets people.
    pub trait Hello as "example.Hello" {
        fn hi(&self, name: String) -> String;
        fn hi_maybe(&self, name: Option<String>) -> Option<String>;
        /// Always fails with a [`GreetingError`].
        fn throwup(&self) -> ();
    }
}

/// Raised by [`Hello::throwup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetingError {
    pub reason: String,
}

impl fmt::Display for GreetingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl FailureType for GreetingError {
    const TYPE_NAME: &'static str = "example.GreetingError";
}

pub struct HelloImpl;

impl Hello for HelloImpl {
    fn hi(&self, name: String) -> Result<String> {
        Ok(format!("Hi, {}", name))
    }

    fn hi_maybe(&self, name: Option<String>) -> Result<Option<String>> {
        name.map(|n| self.hi(n)).transpose()
    }

    fn throwup(&self) -> Result<()> {
        Err(ConduitError::application(&GreetingError {
            reason: "Hey this is annoying".to_string(),
        }))
    }
}

/// Extra method on `example.Hello` that returns a bare null where an
/// optional is declared. Callers reach it through `Stub::call`.
pub fn bad_returns_null() -> MethodDescriptor {
    MethodDescriptor::new("bad_returns_null", vec![], DeclaredType::optional("string"))
}

/// Failure types a `Hello` client can recover by type.
pub fn failure_registry() -> FailureRegistry {
    let mut failures = FailureRegistry::new();
    failures.register::<GreetingError>();
    failures
}

/// Engine serving [`HelloImpl`] through `example.Hello`.
pub fn build_engine() -> Result<InvocationEngine> {
    let mut registry = ServiceRegistry::new();
    registry.bind(<dyn Hello>::binding(Arc::new(HelloImpl)));

    let mut grants = GrantTable::new();
    grants.grant::<HelloImpl>(RemoteAccessGrant::only([<dyn Hello>::NAME]));

    let mut table = <dyn Hello>::dispatch_table();
    table.insert(bad_returns_null(), |_, _| Ok(CallValue::Null));

    InvocationEngine::builder()
        .interface_table::<dyn Hello>(table)
        .resolver(registry)
        .access_policy(grants)
        .build()
}
