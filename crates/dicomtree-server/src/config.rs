//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ServerConfig {
    /// Address to bind.
    #[builder(default = "default_addr()")]
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,

    /// Records buffered per scan before the producer waits for the client.
    #[builder(default = "64")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Threads used to classify directory entries (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub scan_threads: usize,
}

fn default_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 3000))
}

fn default_channel_capacity() -> usize {
    64
}

impl ServerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            channel_capacity: default_channel_capacity(),
            scan_threads: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ServerConfig::builder().build().unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        assert!(ServerConfig::builder().channel_capacity(0usize).build().is_err());
    }
}
