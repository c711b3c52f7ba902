//! Client configuration.

use std::time::Duration;

use rand::Rng;

/// Where the relay listens by default.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:8000/ws";

/// Configuration for a [`ChatClient`](crate::ChatClient).
///
/// Create one with `ClientConfig::default()` and override the fields
/// you care about, or go through
/// [`ChatClientBuilder`](crate::ChatClientBuilder).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay WebSocket URL.
    pub url: String,

    /// Name put in the `sender` field of every chat line we send.
    ///
    /// Default: `guest-` followed by eight random hex digits.
    pub sender: String,

    /// Name shown for our own lines in the local echo.
    pub local_label: String,

    /// How long to wait for the relay to accept the connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            sender: guest_name(),
            local_label: "You".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// A random sender name like `guest-3fa91c07`.
pub fn guest_name() -> String {
    let mut rng = rand::rng();
    let n: u32 = rng.random();
    format!("guest-{n:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "ws://localhost:8000/ws");
        assert_eq!(config.local_label, "You");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.sender.starts_with("guest-"));
    }

    #[test]
    fn test_guest_name_format() {
        let name = guest_name();
        let suffix = name.strip_prefix("guest-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
