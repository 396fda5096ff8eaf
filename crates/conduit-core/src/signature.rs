//! Method signatures.
//!
//! A [`MethodSignature`] names a target method without a native method handle:
//! the owning interface's wire name, the method name, and the declared
//! parameter types. Parameter types take part in resolution, so two methods
//! sharing a name stay distinguishable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type at a parameter or return position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DeclaredType {
    /// Any wire-representable type, identified by a stable name.
    Plain(String),
    /// The optional wrapper around the named type.
    Optional(String),
    /// No value.
    Unit,
}

impl DeclaredType {
    pub fn plain(name: impl Into<String>) -> Self {
        DeclaredType::Plain(name.into())
    }

    pub fn optional(name: impl Into<String>) -> Self {
        DeclaredType::Optional(name.into())
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, DeclaredType::Optional(_))
    }

    /// Name of the underlying type; `"unit"` for [`DeclaredType::Unit`].
    pub fn name(&self) -> &str {
        match self {
            DeclaredType::Plain(name) | DeclaredType::Optional(name) => name,
            DeclaredType::Unit => "unit",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Plain(name) => write!(f, "{}", name),
            DeclaredType::Optional(name) => write!(f, "option<{}>", name),
            DeclaredType::Unit => write!(f, "unit"),
        }
    }
}

/// One method of a remote interface: name, parameter types and return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameter_types: Vec<DeclaredType>,
    pub return_type: DeclaredType,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        parameter_types: Vec<DeclaredType>,
        return_type: DeclaredType,
    ) -> Self {
        Self {
            name: name.into(),
            parameter_types,
            return_type,
        }
    }

    /// Signature of this method on the given owner interface.
    pub fn signature(&self, owner: &str) -> MethodSignature {
        MethodSignature {
            owner: owner.to_string(),
            name: self.name.clone(),
            parameter_types: self.parameter_types.clone(),
        }
    }
}

/// Serializable identification of a target method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Wire name of the owning remote interface.
    pub owner: String,
    /// Name of the method.
    pub name: String,
    /// Declared parameter types, in order.
    pub parameter_types: Vec<DeclaredType>,
}

impl MethodSignature {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        parameter_types: Vec<DeclaredType>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            parameter_types,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.name)
    }
}
