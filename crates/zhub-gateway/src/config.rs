use std::time::Duration;

use serde::Deserialize;

use crate::backoff::BackoffConfig;

// Default broker host.
const BROKER_HOST: &str = "localhost";

// Default broker port.
const BROKER_PORT: u16 = 1883;

// Keep alive time to send `pingreq` to broker when the connection is idle.
const KEEP_ALIVE_TIME: Duration = Duration::from_secs(5);

// Maximum time to wait for a broker acknowledgement of a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// The capacity of the bounded asynchronous channels.
const CHANNEL_CAPACITY: usize = 10;

// Durations written as milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

fn default_broker_host() -> String {
    BROKER_HOST.into()
}

const fn default_broker_port() -> u16 {
    BROKER_PORT
}

const fn default_keep_alive() -> Duration {
    KEEP_ALIVE_TIME
}

const fn default_connect_timeout() -> Duration {
    CONNECT_TIMEOUT
}

const fn default_channel_capacity() -> usize {
    CHANNEL_CAPACITY
}

/// The configuration of a [`GatewaySession`](crate::session::GatewaySession).
///
/// Only the gateway address is mandatory, every other field has a default.
/// Durations are written in milliseconds when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_broker_host")]
    broker_host: String,
    #[serde(default = "default_broker_port")]
    broker_port: u16,
    gateway_address: String,
    #[serde(default = "default_keep_alive", with = "millis")]
    keep_alive: Duration,
    #[serde(default = "default_connect_timeout", with = "millis")]
    connect_timeout: Duration,
    #[serde(default = "default_channel_capacity")]
    channel_capacity: usize,
    #[serde(default)]
    backoff: BackoffConfig,
}

impl GatewayConfig {
    /// Creates a [`GatewayConfig`] for the gateway with the given address.
    #[must_use]
    pub fn new(gateway_address: impl Into<String>) -> Self {
        Self {
            broker_host: default_broker_host(),
            broker_port: BROKER_PORT,
            gateway_address: gateway_address.into(),
            keep_alive: KEEP_ALIVE_TIME,
            connect_timeout: CONNECT_TIMEOUT,
            channel_capacity: CHANNEL_CAPACITY,
            backoff: BackoffConfig::new(),
        }
    }

    /// Sets the broker host and port.
    #[must_use]
    pub fn broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.broker_host = host.into();
        self.broker_port = port;
        self
    }

    /// Sets the keep alive time.
    #[must_use]
    pub const fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the maximum time to wait for a connection acknowledgement.
    #[must_use]
    pub const fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Sets the capacity of the session channels.
    ///
    /// A capacity of `0` is treated as `1`.
    #[must_use]
    pub const fn channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Sets the reconnection [`BackoffConfig`].
    #[must_use]
    pub const fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the broker host.
    #[must_use]
    pub fn broker_host(&self) -> &str {
        &self.broker_host
    }

    /// Returns the broker port.
    #[must_use]
    pub const fn broker_port(&self) -> u16 {
        self.broker_port
    }

    /// Returns the gateway address.
    #[must_use]
    pub fn gateway_address(&self) -> &str {
        &self.gateway_address
    }

    pub(crate) const fn keep_alive_time(&self) -> Duration {
        self.keep_alive
    }

    pub(crate) const fn connect_timeout_time(&self) -> Duration {
        self.connect_timeout
    }

    pub(crate) const fn capacity(&self) -> usize {
        if self.channel_capacity == 0 {
            1
        } else {
            self.channel_capacity
        }
    }

    pub(crate) const fn backoff_config(&self) -> BackoffConfig {
        self.backoff
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::backoff::BackoffConfig;

    use super::GatewayConfig;

    #[test]
    fn defaults() {
        let config = GatewayConfig::new("G1");

        assert_eq!(config.broker_host(), "localhost");
        assert_eq!(config.broker_port(), 1883);
        assert_eq!(config.gateway_address(), "G1");
        assert_eq!(config.keep_alive_time(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout_time(), Duration::from_secs(10));
        assert_eq!(config.capacity(), 10);
        assert_eq!(config.backoff_config(), BackoffConfig::new());
    }

    #[test]
    fn zero_capacity() {
        assert_eq!(GatewayConfig::new("G1").channel_capacity(0).capacity(), 1);
    }

    #[test]
    fn deserialize_minimal() {
        let config: GatewayConfig =
            serde_json::from_value(json!({ "gateway_address": "G1" })).unwrap();

        assert_eq!(config, GatewayConfig::new("G1"));
    }

    #[test]
    fn deserialize_full() {
        let config: GatewayConfig = serde_json::from_value(json!({
            "broker_host": "10.0.0.2",
            "broker_port": 8883,
            "gateway_address": "G1",
            "keep_alive": 2000,
            "connect_timeout": 1500,
            "channel_capacity": 32,
            "backoff": { "initial": 50, "max": 1000, "multiplier": 3, "max_attempts": 4 },
        }))
        .unwrap();

        assert_eq!(
            config,
            GatewayConfig::new("G1")
                .broker("10.0.0.2", 8883)
                .keep_alive(Duration::from_secs(2))
                .connect_timeout(Duration::from_millis(1500))
                .channel_capacity(32)
                .backoff(
                    BackoffConfig::new()
                        .initial(Duration::from_millis(50))
                        .max(Duration::from_secs(1))
                        .multiplier(3)
                        .max_attempts(4)
                )
        );
    }

    #[test]
    fn missing_gateway_address() {
        assert!(serde_json::from_value::<GatewayConfig>(json!({ "broker_port": 1883 })).is_err());
    }
}
