//! A console session: one transport, one state, one log artifact.

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use regex::bytes::Regex;

use super::command::{Command, CommandList};
use super::outcome::{SequenceFailure, SuccessKind};
use super::poller::CONNECTION_LOST_MESSAGE;
use super::sequencer::CommandSequencer;
use super::state::SessionState;
use crate::channel::{MatchSet, ResponseMatcher};
use crate::config::EngineConfig;
use crate::error::{ConfigError, PollError, Result, TransportError};
use crate::logfile::{LogEncryptor, SessionLogger};
use crate::notify::{ErrorReport, NotificationSink};
use crate::redact::Redactor;
use crate::transport::{SerialConfig, SerialTransport, Transport};

/// Settle time for a directory listing before its output is read.
pub const LIST_SETTLE: Duration = Duration::from_millis(200);

/// Drives a bootloader console for the lifetime of one connection.
///
/// The session owns the transport and all engine state exclusively; it is
/// meant to run on a single task. Commands are never in flight
/// concurrently.
///
/// # Cancellation
///
/// Dropping a running [`run_step`](Self::run_step) future (for example
/// from `tokio::select!` or `tokio::time::timeout`) abandons the attempt
/// at its next tick; the poll loop gets no chance to finish gracefully.
/// Call [`stop`](Self::stop) afterwards to flush the log and close the
/// port.
///
/// # Example
///
/// ```rust,no_run
/// use bootcon::config::EngineConfig;
/// use bootcon::driver::{CommandList, Session};
/// use bootcon::logfile::PlainText;
/// use bootcon::notify::NullSink;
/// use bootcon::transport::SerialConfig;
///
/// # async fn example() -> Result<(), bootcon::Error> {
/// let mut session = Session::connect(
///     SerialConfig::new("/dev/ttyUSB0", 115_200),
///     EngineConfig::default(),
///     NullSink,
///     PlainText,
/// )?;
///
/// let commands = CommandList::builder()
///     .send("\r\n")
///     .expect("=>")
///     .build()
///     .map_err(bootcon::error::ConfigError::from)?;
/// if session.run_step(0, &commands).await.is_err() {
///     eprintln!("console did not answer");
/// }
///
/// let log = session.stop().await?;
/// println!("log written to {}", log.display());
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport, N: NotificationSink> {
    transport: T,
    state: SessionState,
    config: EngineConfig,
    sequencer: CommandSequencer,
    redactor: Redactor,
    sink: N,
    logger: SessionLogger,
}

impl<N: NotificationSink> Session<SerialTransport, N> {
    /// Open a serial port and start a session on it.
    pub fn connect(
        serial: SerialConfig,
        config: EngineConfig,
        sink: N,
        encryptor: impl LogEncryptor + 'static,
    ) -> Result<Self> {
        let transport = SerialTransport::open(serial)
            .inspect_err(|err| warn!("could not open console: {}", err))?;
        Ok(Self::new(transport, config, sink, encryptor)?)
    }
}

impl<T: Transport, N: NotificationSink> Session<T, N> {
    /// Start a session on an already open transport.
    pub fn new(
        transport: T,
        config: EngineConfig,
        sink: N,
        encryptor: impl LogEncryptor + 'static,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let sequencer = CommandSequencer::new(&config);
        let redactor = Redactor::new(config.secret.clone(), config.redaction_placeholder.clone());
        let logger = SessionLogger::new(config.log_dir.clone(), encryptor);

        Ok(Self {
            transport,
            state: SessionState::new(),
            config,
            sequencer,
            redactor,
            sink,
            logger,
        })
    }

    /// Engine state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The notification sink.
    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// The session logger, e.g. to add metadata before [`stop`](Self::stop).
    pub fn logger_mut(&mut self) -> &mut SessionLogger {
        &mut self.logger
    }

    /// Run a single attempt of `command` without retries or notifications.
    pub async fn poll(&mut self, command: &Command) -> std::result::Result<MatchSet, PollError> {
        self.sequencer
            .poller()
            .poll(&mut self.transport, &mut self.state, command)
            .await
    }

    /// Run `commands` with retries, emitting progress ticks only.
    pub async fn send_commands(
        &mut self,
        commands: &CommandList,
    ) -> std::result::Result<SuccessKind, SequenceFailure> {
        self.sequencer
            .run(&mut self.transport, &mut self.state, commands, &mut self.sink)
            .await
    }

    /// Run one step and report its outcome.
    ///
    /// On success `step_done(step_index)` is emitted. On failure a
    /// secret-free error report for the step is emitted, followed by
    /// `end_of_sequence`.
    pub async fn run_step(
        &mut self,
        step_index: usize,
        commands: &CommandList,
    ) -> std::result::Result<SuccessKind, SequenceFailure> {
        info!(
            "step {} ({}): {} command(s)",
            step_index,
            self.config.step_labels.label(step_index),
            commands.len()
        );

        match self.send_commands(commands).await {
            Ok(kind) => {
                self.state.completed_steps += 1;
                self.sink.step_done(step_index);
                Ok(kind)
            }
            Err(failure) => {
                self.report_error(step_index);
                Err(failure)
            }
        }
    }

    /// Secret-free description of the most recent failure, attributed to
    /// `step_index`.
    pub fn error_report(&self, step_index: usize) -> ErrorReport {
        ErrorReport {
            step_label: self.config.step_labels.label(step_index).into_owned(),
            last_request: self.redactor.redact(self.state.last_request().unwrap_or_default()),
            last_answer: self.redactor.redact(self.state.last_answer().unwrap_or_default()),
            debug_message: self
                .redactor
                .redact_str(self.state.debug_message().unwrap_or_default()),
        }
    }

    /// Emit the error report for `step_index`, then `end_of_sequence`.
    pub fn report_error(&mut self, step_index: usize) {
        let report = self.error_report(step_index);
        warn!(
            "step '{}' failed: {} (request {:?}, answer {:?})",
            report.step_label,
            report.debug_message,
            report.request_lossy(),
            report.answer_lossy()
        );
        self.sink.error(report);
        self.sink.end_of_sequence();
    }

    /// Write `request`, wait `settle`, and return whatever arrived.
    ///
    /// No draining and no matching; both the request and the answer are
    /// appended to the session capture.
    pub async fn write_raw(
        &mut self,
        request: &[u8],
        settle: Duration,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let result = self.exchange_raw(request, settle).await;
        if result.is_err() {
            self.state.debug_message = Some(CONNECTION_LOST_MESSAGE.to_string());
        }
        result
    }

    async fn exchange_raw(
        &mut self,
        request: &[u8],
        settle: Duration,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        self.transport.write(request).await?;
        self.state.input_buffer.extend(request);
        tokio::time::sleep(settle).await;
        let answer = self.transport.read_available().await?;
        self.state.input_buffer.extend(&answer);
        Ok(answer)
    }

    /// Newest entry of `dir` whose name matches `mask`.
    ///
    /// Lists the directory with `ls`, sorts the matches lexicographically
    /// and returns `dir` joined with the last one, e.g. the most recent
    /// `rootfs-<date>.tar` on the device.
    pub async fn latest_entry(
        &mut self,
        mask: &Regex,
        dir: &str,
    ) -> std::result::Result<String, PollError> {
        let request = format!("ls {}\r\n", dir);
        let answer = self.write_raw(request.as_bytes(), LIST_SETTLE).await?;

        let Some(matches) = mask.match_set(&answer) else {
            debug!("no entry of {} matches {}", dir, mask.as_str());
            return Err(PollError::AnswerMatch {
                timeout: LIST_SETTLE,
            });
        };

        let mut names = matches.values_lossy();
        names.sort();
        let latest = names.pop().unwrap_or_default();
        Ok(format!("{}{}", dir, latest))
    }

    /// End the session: write the log artifact, then close the transport.
    ///
    /// Returns the artifact path. The transport is closed even when the
    /// log cannot be written.
    pub async fn stop(mut self) -> Result<PathBuf> {
        let flushed = self.logger.flush(self.state.input_buffer.as_slice());

        if let Err(err) = self.transport.close().await {
            warn!("closing transport failed: {}", err);
        }

        Ok(flushed?)
    }
}

impl<T: Transport + std::fmt::Debug, N: NotificationSink> std::fmt::Debug for Session<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::StepLabels;
    use crate::error::ErrorKind;
    use crate::logfile::PlainText;
    use crate::notify::{Notification, RecordingSink};
    use crate::transport::ScriptedTransport;

    const SECRET: &str = "Htkbp-factory";

    fn config(dir: &std::path::Path) -> EngineConfig {
        EngineConfig::default()
            .secret(SECRET)
            .log_dir(dir.join("logout"))
            .step_labels(StepLabels::new().with(0, "handshake").with(1, "boot"))
    }

    fn ping_boot() -> CommandList {
        CommandList::builder()
            .send("PING\r\n")
            .expect("PONG")
            .send("BOOT\r\n")
            .expect("Booting")
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_success_notifications() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .respond("PING", "PONG\r\n")
            .respond("BOOT", "Booting...\r\n");
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();

        let result = session.run_step(0, &ping_boot()).await.unwrap();

        assert_eq!(result, SuccessKind::Step);
        assert_eq!(
            session.sink().events(),
            &[
                Notification::Progress,
                Notification::Progress,
                Notification::StepDone(0)
            ]
        );
        assert!(session.sink().errors().is_empty());
        assert_eq!(session.state().completed_steps(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_failure_notifications() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new().respond("PING", "PONG\r\n");
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();

        let failure = session.run_step(1, &ping_boot()).await.unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::AnswerMatch);
        assert_eq!(failure.index, 1);

        let sink = session.sink();
        assert_eq!(sink.progress_count(), 1);
        assert_eq!(sink.end_count(), 1);
        assert_eq!(sink.errors().len(), 1);
        assert_eq!(sink.events().last(), Some(&Notification::EndOfSequence));

        let report = sink.errors()[0];
        assert_eq!(report.step_label, "boot");
        assert_eq!(report.last_request, b"BOOT\r\n");
        assert_eq!(report.debug_message, crate::driver::DEFAULT_DEBUG_MESSAGE);
        assert_eq!(session.state().completed_steps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_report_scrubs_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .respond("login", format!("bad password {}\r\n", SECRET));
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();
        let commands = CommandList::builder()
            .send(format!("login root {}\r\n", SECRET))
            .expect("Welcome")
            .build()
            .unwrap();

        session.run_step(0, &commands).await.unwrap_err();

        let report = session.sink().errors()[0].clone();
        assert_eq!(report.last_request, b"login root PASSWD\r\n");
        assert!(!report.request_lossy().contains(SECRET));
        assert!(!report.answer_lossy().contains(SECRET));
        // raw state keeps the real bytes; only reports are scrubbed
        assert_eq!(
            session.state().last_request(),
            Some(format!("login root {}\r\n", SECRET).as_bytes())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlabelled_step_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = Session::new(
            ScriptedTransport::new(),
            config(tmp.path()),
            RecordingSink::new(),
            PlainText,
        )
        .unwrap();

        let commands = CommandList::builder().send("x\r\n").expect("y").build().unwrap();
        session.run_step(7, &commands).await.unwrap_err();

        assert_eq!(session.sink().errors()[0].step_label, "step 7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_raw_records_both_directions() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new().respond("version", "U-Boot 2018.03\r\n");
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();

        let answer = session
            .write_raw(b"version\r\n", Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(answer, b"U-Boot 2018.03\r\n");
        assert_eq!(
            session.state().input_buffer().as_slice(),
            b"version\r\nU-Boot 2018.03\r\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_entry_picks_last_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new().respond(
            "ls /boot/",
            "rootfs-20180301.tar\r\nzImage\r\nrootfs-20181018.tar\r\nrootfs-20180915.tar\r\n",
        );
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();
        let mask = Regex::new(r"rootfs-\d+\.tar").unwrap();

        let latest = session.latest_entry(&mask, "/boot/").await.unwrap();

        assert_eq!(latest, "/boot/rootfs-20181018.tar");
        assert_eq!(session.transport().writes(), [b"ls /boot/\r\n".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_entry_without_match() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new().respond("ls", "zImage\r\n");
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();
        let mask = Regex::new(r"rootfs-\d+\.tar").unwrap();

        let err = session.latest_entry(&mask, "/boot/").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AnswerMatch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_writes_log_and_closes() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new().respond("PING", "PONG\r\n");
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();
        session.logger_mut().add_metadata("board: test-rig");

        let commands = CommandList::builder().send("PING\r\n").expect("PONG").build().unwrap();
        session.run_step(0, &commands).await.unwrap();

        let path = session.stop().await.unwrap();

        assert_eq!(path, tmp.path().join("logout").join("logout_0.txt"));
        let text = String::from_utf8(fs::read(&path).unwrap()).unwrap();
        assert!(text.contains("New loading process at "));
        assert!(text.ends_with("\nAddition data\nboard: test-rig\nPONG\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_step_still_flushes() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new().respond_chunked("BOOT", ["Boo", "t"]);
        let mut session =
            Session::new(transport, config(tmp.path()), RecordingSink::new(), PlainText).unwrap();
        let commands = CommandList::builder()
            .send("BOOT\r\n")
            .with_extra_timeout(Duration::from_secs(30))
            .expect("Booting")
            .build()
            .unwrap();

        let run = tokio::time::timeout(
            Duration::from_millis(250),
            session.run_step(0, &commands),
        )
        .await;
        assert!(run.is_err());
        assert!(session.sink().events().is_empty());

        let path = session.stop().await.unwrap();
        let text = String::from_utf8(fs::read(path).unwrap()).unwrap();
        assert!(text.ends_with("Boot"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Session::new(
            ScriptedTransport::new(),
            EngineConfig::default().max_attempts(0),
            RecordingSink::new(),
            PlainText,
        );
        assert!(result.is_err());
    }
}
