//! Builder for console sessions.

use std::path::PathBuf;
use std::time::Duration;

use super::session::Session;
use crate::config::{EngineConfig, StepLabels};
use crate::error::Result;
use crate::logfile::{LogEncryptor, PlainText};
use crate::notify::NotificationSink;
use crate::transport::{SerialConfig, SerialTransport, Transport};

/// Builder for constructing console sessions.
///
/// # Example
///
/// ```rust,no_run
/// use bootcon::driver::SessionBuilder;
/// use bootcon::notify::NullSink;
///
/// # fn example() -> Result<(), bootcon::Error> {
/// let session = SessionBuilder::new("/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .secret("factory-password")
///     .step_label(0, "enter bootloader")
///     .connect(NullSink)?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    serial: SerialConfig,
    config: EngineConfig,
    labels: StepLabels,
    encryptor: Box<dyn LogEncryptor>,
}

impl SessionBuilder {
    /// Create a builder for the serial device at `port` (115200 baud).
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            serial: SerialConfig::new(port, 115_200),
            config: EngineConfig::default(),
            labels: StepLabels::new(),
            encryptor: Box::new(PlainText),
        }
    }

    /// Set the baud rate.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// Set the blocking read timeout of the port.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.serial = self.serial.with_read_timeout(timeout);
        self
    }

    /// Replace the engine configuration wholesale.
    ///
    /// Step labels added with [`step_label`](Self::step_label) are merged
    /// over the labels of `config`. A port named by `config` replaces the
    /// one given to [`new`](Self::new).
    pub fn config(mut self, config: EngineConfig) -> Self {
        if let Some(serial) = &config.serial {
            self.serial = serial.clone();
        }
        self.config = config;
        self
    }

    /// Set the secret scrubbed from error reports.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config = self.config.secret(secret);
        self
    }

    /// Set the number of attempts per command.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config = self.config.max_attempts(attempts);
        self
    }

    /// Set the directory for session log artifacts.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config = self.config.log_dir(dir);
        self
    }

    /// Name a step for error reports.
    pub fn step_label(mut self, index: usize, label: impl Into<String>) -> Self {
        self.labels = self.labels.with(index, label);
        self
    }

    /// Encrypt the session log with `encryptor` (default: plain text).
    pub fn encryptor(mut self, encryptor: impl LogEncryptor + 'static) -> Self {
        self.encryptor = Box::new(encryptor);
        self
    }

    /// Open the serial port and start the session.
    pub fn connect<N: NotificationSink>(self, sink: N) -> Result<Session<SerialTransport, N>> {
        let (serial, config, encryptor) = self.into_parts();
        let transport = SerialTransport::open(serial)?;
        Ok(Session::new(transport, config, sink, encryptor)?)
    }

    /// Start the session over an already open transport.
    pub fn build_with<T: Transport, N: NotificationSink>(
        self,
        transport: T,
        sink: N,
    ) -> Result<Session<T, N>> {
        let (_, config, encryptor) = self.into_parts();
        Ok(Session::new(transport, config, sink, encryptor)?)
    }

    fn into_parts(self) -> (SerialConfig, EngineConfig, Box<dyn LogEncryptor>) {
        let mut labels = self.config.step_labels.clone();
        for (index, label) in self.labels.iter() {
            labels = labels.with(index, label);
        }
        let config = self.config.step_labels(labels);
        (self.serial, config, self.encryptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::CommandList;
    use crate::notify::RecordingSink;
    use crate::transport::ScriptedTransport;

    #[tokio::test(start_paused = true)]
    async fn test_builder_labels_reach_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = SessionBuilder::new("/dev/null")
            .config(EngineConfig::default().step_labels(StepLabels::new().with(0, "erase")))
            .step_label(1, "flash")
            .max_attempts(1)
            .log_dir(tmp.path())
            .build_with(ScriptedTransport::new(), RecordingSink::new())
            .unwrap();

        let commands = CommandList::builder().send("x\r\n").expect("ok").build().unwrap();
        session.run_step(0, &commands).await.unwrap_err();
        session.run_step(1, &commands).await.unwrap_err();

        let labels: Vec<_> = session
            .sink()
            .errors()
            .iter()
            .map(|r| r.step_label.clone())
            .collect();
        assert_eq!(labels, ["erase", "flash"]);
        assert_eq!(session.transport().writes().len(), 2);
    }

    #[test]
    fn test_config_file_port_replaces_default() {
        let config = EngineConfig::from_toml_str(
            "[serial]\nport = \"/dev/ttyACM0\"\nbaud_rate = 921600\n",
        )
        .unwrap();
        let builder = SessionBuilder::new("/dev/ttyUSB0").config(config);
        assert_eq!(builder.serial, SerialConfig::new("/dev/ttyACM0", 921_600));

        let builder = SessionBuilder::new("/dev/ttyUSB0").config(EngineConfig::default());
        assert_eq!(builder.serial.port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_builder_rejects_zero_attempts() {
        let result = SessionBuilder::new("/dev/null")
            .max_attempts(0)
            .build_with(ScriptedTransport::new(), RecordingSink::new());
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
