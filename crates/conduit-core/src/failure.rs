//! Failure recovery codec.
//!
//! Every failure crosses the wire as a [`WireFailure`] with an explicit type
//! discriminator next to its payload. The receiving side decodes it through a
//! [`FailureRegistry`]: built-in discriminators and registered application
//! types are materialized faithfully, anything else becomes an
//! [`OpaqueRemoteFailure`] so a missing type can never abort the response.

use crate::error::{ConduitError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

// =============================================================================
// Wire form
// =============================================================================

/// Wire form of a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFailure {
    /// Type discriminator, kept separate from the payload schema.
    #[serde(rename = "type")]
    pub failure_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_summary: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<WireFailure>>,
}

impl WireFailure {
    pub const ACCESS_DENIED: &'static str = "conduit.AccessDenied";
    pub const PROTOCOL_ERROR: &'static str = "conduit.ProtocolError";
    pub const NULL_REFERENCE: &'static str = "conduit.NullReference";
    pub const TRANSPORT_ERROR: &'static str = "conduit.TransportError";
    /// A service method panicked instead of returning.
    pub const SERVICE_PANIC: &'static str = "conduit.ServicePanic";

    pub fn new(failure_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failure_type: failure_type.into(),
            message: message.into(),
            stack_summary: Vec::new(),
            payload: Value::Null,
            cause: None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(
            self.failure_type.as_str(),
            Self::ACCESS_DENIED
                | Self::PROTOCOL_ERROR
                | Self::NULL_REFERENCE
                | Self::TRANSPORT_ERROR
                | Self::SERVICE_PANIC
        )
    }
}

impl From<&ConduitError> for WireFailure {
    fn from(err: &ConduitError) -> Self {
        match err {
            ConduitError::Remote(failure) => failure.to_wire(),
            ConduitError::Application(failure) => failure.to_wire(),
            ConduitError::Transport { message, .. }
            | ConduitError::Protocol { message }
            | ConduitError::AccessDenied { message }
            | ConduitError::NullReference { message }
            | ConduitError::Codec { message, .. }
            | ConduitError::Io { message, .. } => WireFailure::new(err.wire_type(), message.clone()),
            ConduitError::ContentType { .. } => WireFailure::new(err.wire_type(), err.to_string()),
        }
    }
}

// =============================================================================
// Decoded failures
// =============================================================================

/// A failure type that services raise and clients recover by type.
pub trait FailureType: Serialize + DeserializeOwned + fmt::Display + Send + Sync + 'static {
    /// Stable wire discriminator.
    const TYPE_NAME: &'static str;
}

/// Failure raised by a service implementation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{type_name}: {message}")]
pub struct ApplicationFailure {
    type_name: String,
    message: String,
    stack_summary: Vec<String>,
    payload: Value,
    #[source]
    cause: Option<Box<RemoteFailure>>,
}

impl ApplicationFailure {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack_summary: Vec::new(),
            payload: Value::Null,
            cause: None,
        }
    }

    /// Capture a typed failure, keeping its fields as the payload.
    ///
    /// A payload that cannot be serialized is dropped with a warning; the
    /// failure still travels with its discriminator and message, but
    /// [`downcast`](Self::downcast) on the receiving side yields `None`.
    pub fn from_failure<T: FailureType>(failure: &T) -> Self {
        let payload = match serde_json::to_value(failure) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    "Dropping payload of failure type {}, it cannot be serialized: {}",
                    T::TYPE_NAME,
                    e
                );
                Value::Null
            }
        };
        Self {
            payload,
            ..Self::new(T::TYPE_NAME, failure.to_string())
        }
    }

    /// Failure standing in for a service method that panicked.
    pub fn service_panic(message: impl Into<String>) -> Self {
        Self::new(WireFailure::SERVICE_PANIC, message)
    }

    /// True if this failure reports a panicked service method.
    pub fn is_service_panic(&self) -> bool {
        self.type_name == WireFailure::SERVICE_PANIC
    }

    pub fn with_cause(mut self, cause: RemoteFailure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Append a stack summary frame.
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack_summary.push(frame.into());
        self
    }

    /// Recover the typed failure, if this is one of `T`.
    pub fn downcast<T: FailureType>(&self) -> Option<T> {
        if self.type_name != T::TYPE_NAME {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack_summary(&self) -> &[String] {
        &self.stack_summary
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn cause(&self) -> Option<&RemoteFailure> {
        self.cause.as_deref()
    }

    pub fn to_wire(&self) -> WireFailure {
        WireFailure {
            failure_type: self.type_name.clone(),
            message: self.message.clone(),
            stack_summary: self.stack_summary.clone(),
            payload: self.payload.clone(),
            cause: self.cause.as_ref().map(|c| Box::new(c.to_wire())),
        }
    }
}

/// Stand-in for a failure whose type is not available on the receiving side.
///
/// Only produced while decoding a response. The payload of the original
/// failure is discarded; its discriminator and message are kept.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{original_type}: {message}")]
pub struct OpaqueRemoteFailure {
    original_type: String,
    message: String,
    #[source]
    cause: Option<Box<RemoteFailure>>,
}

impl OpaqueRemoteFailure {
    pub(crate) fn new(
        original_type: String,
        message: String,
        cause: Option<Box<RemoteFailure>>,
    ) -> Self {
        Self {
            original_type,
            message,
            cause,
        }
    }

    /// Discriminator the failure was sent under.
    pub fn original_type(&self) -> &str {
        &self.original_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&RemoteFailure> {
        self.cause.as_deref()
    }
}

/// A failure as decoded on the receiving side of a call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteFailure {
    #[error(transparent)]
    Application(ApplicationFailure),

    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Null reference: {message}")]
    NullReference { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error(transparent)]
    Opaque(OpaqueRemoteFailure),
}

impl RemoteFailure {
    /// Discriminator this failure travels under.
    pub fn type_name(&self) -> &str {
        match self {
            RemoteFailure::Application(f) => f.type_name(),
            RemoteFailure::AccessDenied { .. } => WireFailure::ACCESS_DENIED,
            RemoteFailure::Protocol { .. } => WireFailure::PROTOCOL_ERROR,
            RemoteFailure::NullReference { .. } => WireFailure::NULL_REFERENCE,
            RemoteFailure::Transport { .. } => WireFailure::TRANSPORT_ERROR,
            RemoteFailure::Opaque(f) => f.original_type(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteFailure::Application(f) => f.message(),
            RemoteFailure::AccessDenied { message }
            | RemoteFailure::Protocol { message }
            | RemoteFailure::NullReference { message }
            | RemoteFailure::Transport { message } => message,
            RemoteFailure::Opaque(f) => f.message(),
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, RemoteFailure::Opaque(_))
    }

    /// Re-encode, e.g. when a service forwards a failure from its own
    /// outbound call.
    pub fn to_wire(&self) -> WireFailure {
        match self {
            RemoteFailure::Application(f) => f.to_wire(),
            RemoteFailure::Opaque(f) => WireFailure {
                cause: f.cause.as_ref().map(|c| Box::new(c.to_wire())),
                ..WireFailure::new(f.original_type.clone(), f.message.clone())
            },
            other => WireFailure::new(other.type_name(), other.message()),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

type PayloadCheck = fn(&Value) -> std::result::Result<(), serde_json::Error>;

fn check_payload<T: FailureType>(payload: &Value) -> std::result::Result<(), serde_json::Error> {
    T::deserialize(payload).map(|_| ())
}

/// Application failure types known to the receiving side.
#[derive(Clone, Default)]
pub struct FailureRegistry {
    known: HashMap<&'static str, PayloadCheck>,
}

impl FailureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `T` recoverable by its discriminator.
    pub fn register<T: FailureType>(&mut self) -> &mut Self {
        self.known.insert(T::TYPE_NAME, check_payload::<T>);
        self
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.known.contains_key(type_name)
    }

    /// Decode a wire failure, substituting an opaque stand-in for any
    /// discriminator that cannot be resolved here. Causes are decoded with the
    /// same rules.
    ///
    /// Fails only when a registered type's payload does not fit that type.
    pub fn recover(&self, wire: WireFailure) -> Result<RemoteFailure> {
        let cause = match wire.cause {
            Some(cause) => Some(Box::new(self.recover(*cause)?)),
            None => None,
        };

        let failure = match wire.failure_type.as_str() {
            WireFailure::ACCESS_DENIED => RemoteFailure::AccessDenied {
                message: wire.message,
            },
            WireFailure::PROTOCOL_ERROR => RemoteFailure::Protocol {
                message: wire.message,
            },
            WireFailure::NULL_REFERENCE => RemoteFailure::NullReference {
                message: wire.message,
            },
            WireFailure::TRANSPORT_ERROR => RemoteFailure::Transport {
                message: wire.message,
            },
            WireFailure::SERVICE_PANIC => RemoteFailure::Application(ApplicationFailure {
                type_name: wire.failure_type,
                message: wire.message,
                stack_summary: wire.stack_summary,
                payload: Value::Null,
                cause,
            }),
            name => match self.known.get(name) {
                Some(check) => {
                    check(&wire.payload).map_err(|e| ConduitError::Codec {
                        message: format!("payload does not match failure type {}: {}", name, e),
                        source: Some(e),
                    })?;
                    RemoteFailure::Application(ApplicationFailure {
                        type_name: wire.failure_type,
                        message: wire.message,
                        stack_summary: wire.stack_summary,
                        payload: wire.payload,
                        cause,
                    })
                }
                None => {
                    warn!(
                        "Failure type {} is not available locally, substituting opaque failure: {}",
                        wire.failure_type, wire.message
                    );
                    RemoteFailure::Opaque(OpaqueRemoteFailure::new(
                        wire.failure_type,
                        wire.message,
                        cause,
                    ))
                }
            },
        };

        Ok(failure)
    }
}

impl fmt::Debug for FailureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.known.keys().collect();
        names.sort();
        f.debug_struct("FailureRegistry")
            .field("known", &names)
            .finish()
    }
}
