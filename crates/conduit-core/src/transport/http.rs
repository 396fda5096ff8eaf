//! Blocking HTTP transport.

use super::{check_content_type, Transport};
use crate::config::{NetworkConfig, ProtocolConfig};
use crate::{ConduitError, Result};
use reqwest::blocking::Client;
use reqwest::header;
use std::fmt;
use tracing::debug;

/// Posts requests to a single endpoint URL over HTTP.
///
/// The underlying client is blocking; do not call it from inside an async
/// runtime worker.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default timeouts and user agent.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()?;

        Ok(Self::with_client(url, client))
    }

    /// Create a transport around a preconfigured client (proxies, TLS,
    /// default headers).
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn post(&self, content_type: &str, body: Vec<u8>, interface: &str) -> Result<Vec<u8>> {
        debug!("POST {} ({} bytes) for {}", self.url, body.len(), interface);

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, content_type)
            .header(ProtocolConfig::INTERFACE_HEADER, interface)
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConduitError::Transport {
                message: format!("{} responded with HTTP {}", self.url, status),
                status: Some(status.as_u16()),
            });
        }

        let actual = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        check_content_type(actual)?;

        Ok(response.bytes()?.to_vec())
    }
}

impl fmt::Display for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpTransport({})", self.url)
    }
}
