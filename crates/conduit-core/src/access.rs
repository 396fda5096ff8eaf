//! Access control for remote invocation.
//!
//! Remote access is default-deny: an implementation type is invocable only
//! once it has been granted, and a grant may further restrict which of its
//! interfaces are reachable. Checks run against the concrete implementation
//! type recorded in the [`ServiceBinding`], never against the interface.

use crate::service::ServiceBinding;
use crate::signature::MethodSignature;
use crate::{ConduitError, Result};
use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Opt-in marking an implementation type as remotely invocable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteAccessGrant {
    restricted_interfaces: BTreeSet<String>,
}

impl RemoteAccessGrant {
    /// Every interface the type implements is reachable.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the named interfaces are reachable.
    pub fn only<T>(interfaces: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<String>,
    {
        Self {
            restricted_interfaces: interfaces.into_iter().map(Into::into).collect(),
        }
    }

    pub fn restricted_interfaces(&self) -> &BTreeSet<String> {
        &self.restricted_interfaces
    }

    pub fn permits(&self, interface: &str) -> bool {
        self.restricted_interfaces.is_empty() || self.restricted_interfaces.contains(interface)
    }
}

/// Decides whether a resolved service may be invoked for a signature.
///
/// Policies for wrapper or proxy services can look through
/// [`ServiceBinding::implementation`] before consulting grants.
pub trait AccessPolicy: Send + Sync {
    /// Return `Err(ConduitError::AccessDenied)` to stop the call before the
    /// target method runs.
    fn check(&self, binding: &ServiceBinding, signature: &MethodSignature) -> Result<()>;
}

/// Grants keyed by concrete implementation type.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: HashMap<TypeId, RemoteAccessGrant>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant<S: 'static>(&mut self, grant: RemoteAccessGrant) -> &mut Self {
        self.grants.insert(TypeId::of::<S>(), grant);
        self
    }

    pub fn grant_for(&self, concrete_type: TypeId) -> Option<&RemoteAccessGrant> {
        self.grants.get(&concrete_type)
    }

    /// Check a concrete type directly. `type_name` is only used in the
    /// denial message.
    pub fn check_type(
        &self,
        concrete_type: TypeId,
        type_name: &str,
        signature: &MethodSignature,
    ) -> Result<()> {
        let Some(grant) = self.grant_for(concrete_type) else {
            warn!("Denied {}: {} has no remote access grant", signature, type_name);
            return Err(ConduitError::access_denied(format!(
                "{} is not allowed to be invoked remotely",
                type_name
            )));
        };

        if !grant.permits(&signature.owner) {
            warn!(
                "Denied {}: {} is only granted for {:?}",
                signature,
                type_name,
                grant.restricted_interfaces()
            );
            return Err(ConduitError::access_denied(format!(
                "{} is not allowed to be invoked remotely through {}",
                type_name, signature.owner
            )));
        }

        Ok(())
    }
}

impl AccessPolicy for GrantTable {
    fn check(&self, binding: &ServiceBinding, signature: &MethodSignature) -> Result<()> {
        self.check_type(binding.concrete_type(), binding.concrete_type_name(), signature)
    }
}

impl<P: AccessPolicy + ?Sized> AccessPolicy for std::sync::Arc<P> {
    fn check(&self, binding: &ServiceBinding, signature: &MethodSignature) -> Result<()> {
        (**self).check(binding, signature)
    }
}
