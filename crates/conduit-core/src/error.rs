//! Error types for Conduit.
//!
//! One error enum covers both ends of a call. Server-side failures are turned
//! into wire failures by the invocation engine; client-side, anything the
//! remote end raised arrives wrapped in [`ConduitError::Remote`] so it can
//! always be told apart from a locally raised error.

use crate::failure::{ApplicationFailure, FailureType, RemoteFailure, WireFailure};
use thiserror::Error;

/// Main error type for Conduit.
#[derive(Debug, Error)]
pub enum ConduitError {
    /// The remote end raised a failure; the cause is the recovered failure.
    #[error("Remote invocation failed: {0}")]
    Remote(RemoteFailure),

    // Transport errors
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status, when the round trip completed with a non-success status
        status: Option<u16>,
    },

    #[error("Content-Type must be {expected}, got {actual}")]
    ContentType { expected: String, actual: String },

    // Protocol errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    #[error("Null reference: {message}")]
    NullReference { message: String },

    /// Raised by a service implementation.
    #[error("{0}")]
    Application(ApplicationFailure),

    // Serialization errors
    #[error("Codec error: {message}")]
    Codec {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for Conduit operations.
pub type Result<T> = std::result::Result<T, ConduitError>;

impl From<serde_json::Error> for ConduitError {
    fn from(err: serde_json::Error) -> Self {
        ConduitError::Codec {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for ConduitError {
    fn from(err: std::io::Error) -> Self {
        ConduitError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for ConduitError {
    fn from(err: reqwest::Error) -> Self {
        ConduitError::Transport {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

impl From<ApplicationFailure> for ConduitError {
    fn from(failure: ApplicationFailure) -> Self {
        ConduitError::Application(failure)
    }
}

impl From<RemoteFailure> for ConduitError {
    fn from(failure: RemoteFailure) -> Self {
        ConduitError::Remote(failure)
    }
}

impl ConduitError {
    pub fn protocol(message: impl Into<String>) -> Self {
        ConduitError::Protocol {
            message: message.into(),
        }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        ConduitError::AccessDenied {
            message: message.into(),
        }
    }

    pub fn null_reference(message: impl Into<String>) -> Self {
        ConduitError::NullReference {
            message: message.into(),
        }
    }

    pub fn codec(message: impl Into<String>) -> Self {
        ConduitError::Codec {
            message: message.into(),
            source: None,
        }
    }

    /// Raise a typed application failure from a service implementation.
    pub fn application<T: FailureType>(failure: &T) -> Self {
        ConduitError::Application(ApplicationFailure::from_failure(failure))
    }

    /// Wire discriminator this error travels under when it ends a call on the
    /// server.
    ///
    /// Built-in discriminators:
    /// - `conduit.AccessDenied`
    /// - `conduit.ProtocolError` (also used for codec errors inside a dispatch)
    /// - `conduit.NullReference`
    /// - `conduit.TransportError` (a service's own outbound call failed)
    ///
    /// Application and remote failures keep their original discriminator.
    pub fn wire_type(&self) -> &str {
        match self {
            ConduitError::Remote(failure) => failure.type_name(),
            ConduitError::Application(failure) => failure.type_name(),
            ConduitError::AccessDenied { .. } => WireFailure::ACCESS_DENIED,
            ConduitError::NullReference { .. } => WireFailure::NULL_REFERENCE,
            ConduitError::Transport { .. }
            | ConduitError::ContentType { .. }
            | ConduitError::Io { .. } => WireFailure::TRANSPORT_ERROR,
            ConduitError::Protocol { .. } | ConduitError::Codec { .. } => {
                WireFailure::PROTOCOL_ERROR
            }
        }
    }

    /// True if the failure originated on the remote end of a call.
    pub fn is_remote(&self) -> bool {
        matches!(self, ConduitError::Remote(_))
    }

    /// The recovered remote failure, if this error wraps one.
    pub fn remote_cause(&self) -> Option<&RemoteFailure> {
        match self {
            ConduitError::Remote(failure) => Some(failure),
            _ => None,
        }
    }
}
