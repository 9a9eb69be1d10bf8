//! Scrubbing the deployment secret out of reports.

use memchr::memmem;
use secrecy::{ExposeSecret, SecretString};

/// Replaces every occurrence of a secret token with a placeholder.
///
/// With no secret configured, data passes through untouched.
#[derive(Debug, Clone)]
pub struct Redactor {
    secret: Option<SecretString>,
    placeholder: String,
}

impl Redactor {
    /// Create a redactor. An empty secret is treated as no secret.
    pub fn new(secret: Option<SecretString>, placeholder: impl Into<String>) -> Self {
        let secret = secret.filter(|s| !s.expose_secret().is_empty());
        Self {
            secret,
            placeholder: placeholder.into(),
        }
    }

    /// Return `data` with the secret replaced.
    pub fn redact(&self, data: &[u8]) -> Vec<u8> {
        let Some(secret) = &self.secret else {
            return data.to_vec();
        };
        let needle = secret.expose_secret().as_bytes();

        let mut out = Vec::with_capacity(data.len());
        let mut last = 0;
        for pos in memmem::find_iter(data, needle) {
            // find_iter yields non-overlapping matches, left to right
            out.extend_from_slice(&data[last..pos]);
            out.extend_from_slice(self.placeholder.as_bytes());
            last = pos + needle.len();
        }
        out.extend_from_slice(&data[last..]);
        out
    }

    /// Return `text` with the secret replaced.
    pub fn redact_str(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) => text.replace(secret.expose_secret(), &self.placeholder),
            None => text.to_string(),
        }
    }
}
