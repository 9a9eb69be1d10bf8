//! Serial port configuration.

use std::time::Duration;

use serde::Deserialize;

/// Serial port settings for a console session.
///
/// Loaded from the `[serial]` table of an engine configuration file:
///
/// ```toml
/// [serial]
/// port = "/dev/ttyUSB0"
/// baud_rate = 115200
/// read_timeout_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialConfig {
    /// Port identifier (e.g. `/dev/ttyUSB0`, `COM3`).
    pub port: String,

    /// Line rate in baud.
    pub baud_rate: u32,

    /// Driver-level read timeout.
    #[serde(
        rename = "read_timeout_ms",
        default = "default_read_timeout",
        with = "crate::config::millis"
    )]
    pub read_timeout: Duration,
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(100)
}

impl SerialConfig {
    /// Create a configuration with the default 100 ms read timeout.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout: default_read_timeout(),
        }
    }

    /// Override the driver read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}
