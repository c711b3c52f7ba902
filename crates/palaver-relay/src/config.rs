//! Relay configuration.

/// Where the relay listens unless told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Environment variable the `palaver-relay` binary reads its bind
/// address from.
pub const BIND_ADDR_ENV: &str = "PALAVER_RELAY_ADDR";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    /// Capacity of the hub's command channel. When it fills up,
    /// connection handlers wait (backpressure).
    ///
    /// Default: 256.
    pub hub_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            hub_capacity: 256,
        }
    }
}

impl RelayConfig {
    /// Defaults, with the bind address taken from `PALAVER_RELAY_ADDR`
    /// when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            if !addr.trim().is_empty() {
                config.bind_addr = addr.trim().to_string();
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.hub_capacity, 256);
    }
}
