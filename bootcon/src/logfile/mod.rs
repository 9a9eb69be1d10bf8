//! Session log artifacts.
//!
//! At teardown the whole console capture is prefaced with a banner and
//! any caller metadata, handed to a [`LogEncryptor`], and written to the
//! next free `logout_<n>.txt` in the log directory. Key management and
//! the cipher itself live behind the encryptor.

mod banner;
mod store;

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone};
use log::info;

pub use banner::{ADDITIONAL_INFO_HEADING, BANNER_WIDTH};
pub use store::LogStore;

use crate::error::LogError;

/// Turns a plaintext capture into the opaque artifact bytes.
pub trait LogEncryptor: Send + Sync {
    /// Encrypt `data`.
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, LogError>;
}

impl<E: LogEncryptor + ?Sized> LogEncryptor for Box<E> {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, LogError> {
        (**self).encrypt(data)
    }
}

/// Writes captures unencrypted. For development consoles only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl LogEncryptor for PlainText {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, LogError> {
        Ok(data.to_vec())
    }
}

/// Builds and writes one artifact per session.
pub struct SessionLogger {
    encryptor: Box<dyn LogEncryptor>,
    store: LogStore,
    metadata: Vec<String>,
}

impl SessionLogger {
    /// Create a logger writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, encryptor: impl LogEncryptor + 'static) -> Self {
        Self {
            encryptor: Box::new(encryptor),
            store: LogStore::new(dir),
            metadata: Vec::new(),
        }
    }

    /// Add a line to the additional-information block.
    pub fn add_metadata(&mut self, line: impl Into<String>) {
        self.metadata.push(line.into());
    }

    /// The artifact store.
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Plaintext artifact body for a capture started at `at`.
    pub fn render<Tz>(&self, capture: &[u8], at: &DateTime<Tz>) -> Vec<u8>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let banner = banner::render(at);
        let info = banner::additional_info(&self.metadata);

        let mut body = Vec::with_capacity(banner.len() + info.len() + capture.len());
        body.extend_from_slice(banner.as_bytes());
        body.extend_from_slice(info.as_bytes());
        body.extend_from_slice(capture);
        body
    }

    /// Encrypt and write the capture; returns the artifact path.
    pub fn flush(&self, capture: &[u8]) -> Result<PathBuf, LogError> {
        let body = self.render(capture, &Local::now());
        let blob = self.encryptor.encrypt(&body)?;
        let path = self.store.write_next(&blob)?;
        info!("session log written to {}", path.display());
        Ok(path)
    }
}

impl std::fmt::Debug for SessionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLogger")
            .field("store", &self.store)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
