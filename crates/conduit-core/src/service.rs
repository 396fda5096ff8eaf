//! Remote interfaces, dispatch tables and service bindings.
//!
//! A remote interface is a trait object type (`dyn Hello`) implementing
//! [`RemoteInterface`]. Its [`DispatchTable`] maps a method name plus declared
//! parameter types to a handler that decodes the arguments, calls the method
//! and encodes the result. Tables are normally generated by
//! [`remote_interface!`](crate::remote_interface) but can be filled by hand.
//!
//! # Thread Safety
//!
//! Tables and bindings are immutable once built and are shared via `Arc`.

use crate::signature::{DeclaredType, MethodDescriptor, MethodSignature};
use crate::value::CallValue;
use crate::{ConduitError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handler invoked for one method of interface `I`.
pub type Handler<I> = Box<dyn Fn(&I, Vec<CallValue>) -> Result<CallValue> + Send + Sync>;

/// A trait object type that can be invoked remotely.
pub trait RemoteInterface: Send + Sync + 'static {
    /// Stable wire name of the interface.
    const NAME: &'static str;

    fn dispatch_table() -> DispatchTable<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    name: String,
    parameter_types: Vec<DeclaredType>,
}

struct DispatchEntry<I: ?Sized> {
    descriptor: MethodDescriptor,
    handler: Handler<I>,
}

/// Methods of one interface, keyed by name and declared parameter types.
pub struct DispatchTable<I: ?Sized> {
    entries: HashMap<MethodKey, DispatchEntry<I>>,
}

impl<I: ?Sized> DispatchTable<I> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add a method. A later insert with the same name and parameter types
    /// replaces the earlier one.
    pub fn insert<F>(&mut self, descriptor: MethodDescriptor, handler: F) -> &mut Self
    where
        F: Fn(&I, Vec<CallValue>) -> Result<CallValue> + Send + Sync + 'static,
    {
        let key = MethodKey {
            name: descriptor.name.clone(),
            parameter_types: descriptor.parameter_types.clone(),
        };
        self.entries.insert(
            key,
            DispatchEntry {
                descriptor,
                handler: Box::new(handler),
            },
        );
        self
    }

    fn entry(&self, signature: &MethodSignature) -> Option<&DispatchEntry<I>> {
        let key = MethodKey {
            name: signature.name.clone(),
            parameter_types: signature.parameter_types.clone(),
        };
        self.entries.get(&key)
    }

    pub fn descriptor(&self, signature: &MethodSignature) -> Option<&MethodDescriptor> {
        self.entry(signature).map(|e| &e.descriptor)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.entries.values().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I: ?Sized> Default for DispatchTable<I> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Type-erased dispatch
// =============================================================================

/// Dispatch for one interface with the interface type erased, so the engine
/// can hold tables for many interfaces.
pub(crate) trait InterfaceDispatch: Send + Sync {
    fn descriptor(&self, signature: &MethodSignature) -> Option<&MethodDescriptor>;

    fn invoke(
        &self,
        binding: &ServiceBinding,
        signature: &MethodSignature,
        args: Vec<CallValue>,
    ) -> Result<CallValue>;
}

pub(crate) struct TypedDispatch<I: ?Sized> {
    table: DispatchTable<I>,
}

impl<I: RemoteInterface + ?Sized> TypedDispatch<I> {
    pub(crate) fn new(table: DispatchTable<I>) -> Self {
        Self { table }
    }
}

impl<I: RemoteInterface + ?Sized> InterfaceDispatch for TypedDispatch<I> {
    fn descriptor(&self, signature: &MethodSignature) -> Option<&MethodDescriptor> {
        self.table.descriptor(signature)
    }

    fn invoke(
        &self,
        binding: &ServiceBinding,
        signature: &MethodSignature,
        args: Vec<CallValue>,
    ) -> Result<CallValue> {
        let instance = binding.instance::<I>().ok_or_else(|| {
            ConduitError::protocol(format!(
                "service bound for {} does not implement {}",
                binding.interface_name(),
                I::NAME
            ))
        })?;
        let entry = self
            .table
            .entry(signature)
            .ok_or_else(|| ConduitError::protocol(format!("no such method: {}", signature)))?;
        (entry.handler)(&*instance, args)
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// A service instance bound to the remote interface it is exposed through.
///
/// Records the concrete implementation type so access checks run against the
/// implementation rather than the interface.
#[derive(Clone)]
pub struct ServiceBinding {
    interface: &'static str,
    /// Holds an `Arc<I>` for the bound interface `I`.
    instance: Arc<dyn Any + Send + Sync>,
    implementation: Arc<dyn Any + Send + Sync>,
    concrete_type: TypeId,
    concrete_type_name: &'static str,
}

impl ServiceBinding {
    /// Bind `service` through `instance`, the same object viewed as `I`.
    ///
    /// Usually called through the generated `<dyn Trait>::binding(service)`.
    pub fn new<I, S>(service: Arc<S>, instance: Arc<I>) -> Self
    where
        I: RemoteInterface + ?Sized,
        S: Send + Sync + 'static,
    {
        Self {
            interface: I::NAME,
            instance: Arc::new(instance),
            implementation: service,
            concrete_type: TypeId::of::<S>(),
            concrete_type_name: std::any::type_name::<S>(),
        }
    }

    pub fn interface_name(&self) -> &'static str {
        self.interface
    }

    /// The bound instance as interface `I`, if it was bound as one.
    pub fn instance<I: RemoteInterface + ?Sized>(&self) -> Option<Arc<I>> {
        self.instance.downcast_ref::<Arc<I>>().cloned()
    }

    /// The concrete implementation object, for policies that need to look
    /// through wrappers.
    pub fn implementation(&self) -> &(dyn Any + Send + Sync) {
        &*self.implementation
    }

    pub fn concrete_type(&self) -> TypeId {
        self.concrete_type
    }

    pub fn concrete_type_name(&self) -> &'static str {
        self.concrete_type_name
    }
}

impl fmt::Debug for ServiceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBinding")
            .field("interface", &self.interface)
            .field("implementation", &self.concrete_type_name)
            .finish()
    }
}

/// Finds the service instance for an interface name.
///
/// For a given process lifetime, the answer must depend only on the name.
pub trait ServiceResolver: Send + Sync {
    fn resolve(&self, interface: &str) -> Result<ServiceBinding>;
}

impl<F> ServiceResolver for F
where
    F: Fn(&str) -> Result<ServiceBinding> + Send + Sync,
{
    fn resolve(&self, interface: &str) -> Result<ServiceBinding> {
        self(interface)
    }
}

/// Services bound by hand at startup.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    bindings: HashMap<&'static str, ServiceBinding>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a service under its interface name, replacing any earlier binding.
    pub fn bind(&mut self, binding: ServiceBinding) -> &mut Self {
        self.bindings.insert(binding.interface_name(), binding);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl ServiceResolver for ServiceRegistry {
    fn resolve(&self, interface: &str) -> Result<ServiceBinding> {
        self.bindings
            .get(interface)
            .cloned()
            .ok_or_else(|| ConduitError::protocol(format!("no service bound for {}", interface)))
    }
}
