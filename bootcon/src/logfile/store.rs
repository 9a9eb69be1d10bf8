//! Sequentially numbered log artifacts.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;

/// Directory of `logout_<n>.txt` artifacts.
///
/// New artifacts take the lowest unused index. Files are created with
/// `create_new`, so an existing artifact is never overwritten even if
/// another process claims an index concurrently.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    /// Use `dir`, which is created on first write if absent.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of artifact `index`.
    pub fn file_name(index: usize) -> String {
        format!("logout_{}.txt", index)
    }

    /// Path the next artifact would get.
    pub fn next_path(&self) -> PathBuf {
        let mut index = 0;
        loop {
            let path = self.dir.join(Self::file_name(index));
            if !path.exists() {
                return path;
            }
            index += 1;
        }
    }

    /// Write `data` to the next free artifact and return its path.
    pub fn write_next(&self, data: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let mut index = 0;
        loop {
            let path = self.dir.join(Self::file_name(index));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(data)?;
                    file.sync_all()?;
                    debug!("wrote {} log bytes to {}", data.len(), path.display());
                    return Ok(path);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => index += 1,
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_directory_and_numbers_from_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::new(tmp.path().join("logout"));

        let first = store.write_next(b"one").unwrap();
        let second = store.write_next(b"two").unwrap();

        assert_eq!(first.file_name().unwrap(), "logout_0.txt");
        assert_eq!(second.file_name().unwrap(), "logout_1.txt");
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn test_first_gap_wins() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("logout_0.txt"), b"old").unwrap();
        fs::write(tmp.path().join("logout_2.txt"), b"old").unwrap();
        let store = LogStore::new(tmp.path());

        assert_eq!(store.next_path(), tmp.path().join("logout_1.txt"));
        let path = store.write_next(b"new").unwrap();
        assert_eq!(path, tmp.path().join("logout_1.txt"));
        assert_eq!(fs::read(tmp.path().join("logout_2.txt")).unwrap(), b"old");
        assert_eq!(store.next_path(), tmp.path().join("logout_3.txt"));
    }
}
