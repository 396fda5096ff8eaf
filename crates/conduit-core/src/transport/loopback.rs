//! In-process transport.

use super::{check_content_type, Transport};
use crate::engine::InvocationEngine;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Hands request bytes straight to an [`InvocationEngine`] in this process.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    engine: Arc<InvocationEngine>,
}

impl LoopbackTransport {
    pub fn new(engine: Arc<InvocationEngine>) -> Self {
        Self { engine }
    }
}

impl Transport for LoopbackTransport {
    fn post(&self, content_type: &str, body: Vec<u8>, _interface: &str) -> Result<Vec<u8>> {
        check_content_type(content_type)?;
        self.engine.execute(&body)
    }
}

impl fmt::Display for LoopbackTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoopbackTransport")
    }
}
