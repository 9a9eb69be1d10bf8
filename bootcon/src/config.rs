//! Engine configuration.
//!
//! Every timing constant, the retry budget, the redaction secret and the
//! step label table live here and are owned by one engine instance.
//! Configurations can be built in code or loaded from TOML:
//!
//! ```toml
//! tick_ms = 100
//! base_timeout_ms = 100
//! max_clean_ms = 45000
//! max_attempts = 3
//! secret = "factory-password"
//! log_dir = "logout"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [steps]
//! 0 = "erase flash"
//! 1 = "load kernel"
//! ```

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::transport::SerialConfig;

/// Standard poll tick.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Longest time the input buffer may take to drain.
pub const DEFAULT_MAX_CLEAN_DURATION: Duration = Duration::from_secs(45);

/// Attempts per command before a sequence is aborted.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Replacement written over the secret in reports.
pub const DEFAULT_PLACEHOLDER: &str = "PASSWD";

/// Default log directory, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logout";

/// Human-readable names of the caller's steps, keyed by step index.
#[derive(Debug, Clone, Default)]
pub struct StepLabels {
    labels: IndexMap<usize, String>,
}

impl StepLabels {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a label.
    pub fn with(mut self, index: usize, label: impl Into<String>) -> Self {
        self.labels.insert(index, label.into());
        self
    }

    /// Label for `index`, falling back to `step <index>`.
    pub fn label(&self, index: usize) -> Cow<'_, str> {
        match self.labels.get(&index) {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(format!("step {}", index)),
        }
    }

    /// Labelled steps in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(i, s)| (*i, s.as_str()))
    }

    /// Number of labelled steps.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no step is labelled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for StepLabels {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(|(i, s)| (i, s.into())).collect(),
        }
    }
}

/// Configuration of one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Poll tick; every wait in the engine is a multiple of it.
    pub tick: Duration,

    /// Answer timeout before a command's extra timeout is added.
    pub base_timeout: Duration,

    /// Budget for draining stale input before a request.
    pub max_clean_duration: Duration,

    /// Attempts per command.
    pub max_attempts: usize,

    /// Token scrubbed from error reports.
    pub secret: Option<SecretString>,

    /// Text written in place of the secret.
    pub redaction_placeholder: String,

    /// Step names used in error reports.
    pub step_labels: StepLabels,

    /// Directory receiving session log artifacts.
    pub log_dir: PathBuf,

    /// Console port, when the configuration names one.
    pub serial: Option<SerialConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            base_timeout: DEFAULT_TICK,
            max_clean_duration: DEFAULT_MAX_CLEAN_DURATION,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            secret: None,
            redaction_placeholder: DEFAULT_PLACEHOLDER.to_string(),
            step_labels: StepLabels::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            serial: None,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with the standard timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll tick.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the base answer timeout.
    pub fn base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }

    /// Set the drain budget.
    pub fn max_clean_duration(mut self, duration: Duration) -> Self {
        self.max_clean_duration = duration;
        self
    }

    /// Set the attempts per command.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the secret scrubbed from reports.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the redaction placeholder.
    pub fn redaction_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.redaction_placeholder = placeholder.into();
        self
    }

    /// Set the step label table.
    pub fn step_labels(mut self, labels: StepLabels) -> Self {
        self.step_labels = labels;
        self
    }

    /// Set the log directory.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Check the values an engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::Invalid {
                message: "tick must be greater than zero".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = Self::default();

        let mut step_labels = StepLabels::new();
        for (key, label) in file.steps {
            let index = key.parse::<usize>().map_err(|_| ConfigError::Invalid {
                message: format!("step key '{}' is not an index", key),
            })?;
            step_labels = step_labels.with(index, label);
        }

        let config = Self {
            tick: file.tick_ms.map_or(defaults.tick, Duration::from_millis),
            base_timeout: file
                .base_timeout_ms
                .map_or(defaults.base_timeout, Duration::from_millis),
            max_clean_duration: file
                .max_clean_ms
                .map_or(defaults.max_clean_duration, Duration::from_millis),
            max_attempts: file.max_attempts.unwrap_or(defaults.max_attempts),
            secret: file.secret.map(SecretString::from),
            redaction_placeholder: file
                .redaction_placeholder
                .unwrap_or(defaults.redaction_placeholder),
            step_labels,
            log_dir: file.log_dir.unwrap_or(defaults.log_dir),
            serial: file.serial,
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk shape of [`EngineConfig`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    tick_ms: Option<u64>,
    base_timeout_ms: Option<u64>,
    max_clean_ms: Option<u64>,
    max_attempts: Option<usize>,
    secret: Option<String>,
    redaction_placeholder: Option<String>,
    log_dir: Option<PathBuf>,
    serial: Option<SerialConfig>,
    #[serde(default)]
    steps: IndexMap<String, String>,
}

/// `Duration` as integer milliseconds, for serde `with` attributes.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tick, Duration::from_millis(100));
        assert_eq!(config.base_timeout, Duration::from_millis(100));
        assert_eq!(config.max_clean_duration, Duration::from_secs(45));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.redaction_placeholder, "PASSWD");
        assert_eq!(config.log_dir, PathBuf::from("logout"));
        assert!(config.secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_step_label_fallback() {
        let labels = StepLabels::new().with(0, "erase flash");
        assert_eq!(labels.label(0), "erase flash");
        assert_eq!(labels.label(4), "step 4");
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            tick_ms = 50
            max_attempts = 5
            secret = "hunter2"
            log_dir = "/tmp/boot-logs"

            [steps]
            0 = "erase flash"
            2 = "load kernel"
            "#,
        )
        .unwrap();

        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.base_timeout, Duration::from_millis(100));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.secret.as_ref().unwrap().expose_secret(), "hunter2");
        assert_eq!(config.step_labels.len(), 2);
        assert_eq!(config.step_labels.label(2), "load kernel");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/boot-logs"));
    }

    #[test]
    fn test_from_toml_serial_table() {
        let config = EngineConfig::from_toml_str(
            r#"
            [serial]
            port = "/dev/ttyUSB1"
            baud_rate = 57600
            read_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(
            config.serial,
            Some(
                SerialConfig::new("/dev/ttyUSB1", 57_600)
                    .with_read_timeout(Duration::from_millis(250))
            )
        );
    }

    #[test]
    fn test_from_toml_serial_defaults_read_timeout() {
        let config =
            EngineConfig::from_toml_str("[serial]\nport = \"COM3\"\nbaud_rate = 115200\n").unwrap();
        let serial = config.serial.unwrap();
        assert_eq!(serial.port, "COM3");
        assert_eq!(serial.read_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_from_toml_serial_rejects_unknown_key() {
        let err = EngineConfig::from_toml_str("[serial]\nport = \"COM3\"\nbaud = 9600\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_from_toml_rejects_bad_step_key() {
        let err = EngineConfig::from_toml_str("[steps]\nfirst = \"erase\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_attempts_invalid() {
        let err = EngineConfig::from_toml_str("max_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = EngineConfig::from_toml_str("tick = 100").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
