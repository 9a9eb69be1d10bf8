//! Serial port transport using the `serialport` crate.

use std::io::{Read, Write};

use log::debug;
use serialport::SerialPort;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::Transport;
use super::config::SerialConfig;
use crate::error::TransportError;

/// Transport over a local serial port.
///
/// The port is driven synchronously. Reads only ever request bytes the
/// driver already reports as waiting; writes block until the request is
/// handed to the driver, bounded by `read_timeout`. On a multi-threaded
/// runtime each port call runs under [`tokio::task::block_in_place`] so
/// other tasks keep their worker; on a current-thread runtime it runs
/// inline.
pub struct SerialTransport {
    /// Open port handle (None once closed).
    port: Option<Box<dyn SerialPort>>,

    /// Configuration used to open the port.
    config: SerialConfig,
}

impl SerialTransport {
    /// Open the configured serial port.
    pub fn open(config: SerialConfig) -> Result<Self, TransportError> {
        debug!("opening {} at {} baud", config.port, config.baud_rate);

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        Ok(Self {
            port: Some(port),
            config,
        })
    }

    /// Configuration used for this port.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

/// Run a blocking port call without starving other tasks.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

impl Transport for SerialTransport {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port_mut()?;
        blocking(|| {
            port.write_all(data)?;
            port.flush()
        })?;
        Ok(())
    }

    async fn available(&mut self) -> Result<usize, TransportError> {
        let port = self.port_mut()?;
        let n = blocking(|| port.bytes_to_read())?;
        Ok(n as usize)
    }

    async fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let port = self.port_mut()?;
        let mut buf = vec![0u8; n];
        blocking(|| port.read_exact(&mut buf))?;
        Ok(buf)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!("closed {}", self.config.port);
        }
        Ok(())
    }
}
