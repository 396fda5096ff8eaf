//! Request/response transports.
//!
//! A transport performs exactly one round trip per call: no retries, no
//! pooling guarantees, no streaming.

mod http;
mod loopback;

pub use http::HttpTransport;
pub use loopback::LoopbackTransport;

use crate::config::ProtocolConfig;
use crate::{ConduitError, Result};
use std::fmt;

/// Carries one encoded request to the server and returns the encoded response.
pub trait Transport: fmt::Display + Send + Sync {
    /// Post `body` tagged with `content_type`. `interface` is the name of the
    /// target remote interface, passed along as a routing hint.
    fn post(&self, content_type: &str, body: Vec<u8>, interface: &str) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn post(&self, content_type: &str, body: Vec<u8>, interface: &str) -> Result<Vec<u8>> {
        (**self).post(content_type, body, interface)
    }
}

/// Check a content type against the protocol's, ignoring parameters such as
/// `charset`.
pub fn check_content_type(actual: &str) -> Result<()> {
    let essence = actual.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case(ProtocolConfig::CONTENT_TYPE) {
        Ok(())
    } else {
        Err(ConduitError::ContentType {
            expected: ProtocolConfig::CONTENT_TYPE.to_string(),
            actual: actual.to_string(),
        })
    }
}
