//! # Bootcon
//!
//! Async command/response engine for bootloader consoles reached over a
//! serial link.
//!
//! Bootcon drives an interactive console (U-Boot, a vendor monitor, a
//! recovery shell) the way an operator would: send a line, wait for the
//! expected answer, retry a bounded number of times, and report progress
//! and failures to the caller.
//!
//! ## Features
//!
//! - Serial transport via serialport, plus a scripted in-memory transport
//! - Stale-input draining before every request
//! - Tick-based polling with per-command answer budgets
//! - Bounded retries with fail-fast sequencing
//! - Secret scrubbing in every error report
//! - One log artifact per session, with a pluggable encryptor
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bootcon::driver::{CommandList, SessionBuilder};
//! use bootcon::notify::NullSink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = SessionBuilder::new("/dev/ttyUSB0")
//!         .baud_rate(115_200)
//!         .step_label(0, "enter bootloader")
//!         .connect(NullSink)?;
//!
//!     let commands = CommandList::builder()
//!         .send("\r\n")
//!         .expect("=>")
//!         .send("printenv bootcmd\r\n")
//!         .expect(r"bootcmd=(\S+)")
//!         .build()?;
//!
//!     session.run_step(0, &commands).await?;
//!
//!     let log = session.stop().await?;
//!     println!("{}", log.display());
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod logfile;
pub mod notify;
pub mod redact;
pub mod transport;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use driver::{Command, CommandList, Session, SessionBuilder, SuccessKind};
pub use error::{Error, ErrorKind};
pub use notify::{Notification, NotificationSink};
pub use transport::{SerialConfig, Transport};
