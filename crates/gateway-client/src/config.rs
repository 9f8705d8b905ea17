//! Configuration for the gateway connection.

use serde::{Deserialize, Serialize};

/// Connection settings for the SMS gateway server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Hostname of the gateway (no scheme).
    pub hostname: String,
    /// TCP port the gateway listens on.
    pub port: u16,
}

impl GatewayConfig {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Base URL of the gateway HTTP server.
    ///
    /// The gateway speaks in the clear on a private link; there is no TLS
    /// termination at this hop.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }

    /// The JSON-RPC endpoint URL.
    pub fn rpc_url(&self) -> String {
        format!("{}/rpc", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_urls_from_host_and_port() {
        let config = GatewayConfig::new("gateway.local", 8085);
        assert_eq!(config.base_url(), "http://gateway.local:8085");
        assert_eq!(config.rpc_url(), "http://gateway.local:8085/rpc");
    }
}
