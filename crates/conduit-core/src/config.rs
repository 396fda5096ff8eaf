//! Centralized configuration for Conduit.
//!
//! Protocol identifiers and network limits shared by the client stub, the
//! transports and the HTTP host.

use std::time::Duration;

/// Wire protocol constants.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// The single content type attached to every request and response.
    pub const CONTENT_TYPE: &'static str = "application/x-conduit+json";
    /// Routing hint header carrying the target interface name.
    pub const INTERFACE_HEADER: &'static str = "x-conduit-interface";
    pub const RPC_PATH: &'static str = "/rpc";
    pub const HEALTH_PATH: &'static str = "/health";
    pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024; // 16MB
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const USER_AGENT: &'static str = "Conduit/0.3";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(NetworkConfig::CONNECT_TIMEOUT <= NetworkConfig::REQUEST_TIMEOUT);
        assert!(NetworkConfig::REQUEST_TIMEOUT > Duration::ZERO);
    }

    #[test]
    fn test_interface_header_is_lowercase() {
        // http header names are compared case-insensitively but stored lowercase
        assert_eq!(
            ProtocolConfig::INTERFACE_HEADER,
            ProtocolConfig::INTERFACE_HEADER.to_lowercase()
        );
    }
}
