// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Advisory exclusive file lock used to enforce "at most one live reader"
//! and to carry stale-resource detection across reader crashes.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

pub struct Lock {
    file: File,
    path: PathBuf,
}

/// Directory holding all advisory lock files, `{tmp}/zerobuffer`.
pub fn lock_dir() -> PathBuf {
    std::env::temp_dir().join(crate::config::LOCK_DIR_NAME)
}

/// Path to the lock file for a given buffer name.
pub fn lock_path(name: &str) -> PathBuf {
    lock_dir().join(format!("{name}.lock"))
}

impl Lock {
    /// Create and exclusively lock the file at `path`, creating parent
    /// directories as needed. Fails with [`Error::ReaderAlreadyConnected`]
    /// if another process already holds the lock.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o644)
            .open(path)?;

        // SAFETY: file.as_raw_fd() is valid for the lifetime of this
        // call; LOCK_EX|LOCK_NB requests a non-blocking exclusive lock
        // which flock releases automatically when the fd is closed.
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                return Err(Error::ReaderAlreadyConnected);
            }
            return Err(err.into());
        }

        Ok(Self { file, path: path.to_path_buf() })
    }

    /// Attempt to steal the lock at `path`: acquire it non-blocking and,
    /// if successful, release and delete the file. Returns `true` if the
    /// lock was stolen (meaning no live holder existed), `false` if it is
    /// currently held by a live process.
    pub fn try_steal(path: &Path) -> bool {
        let Ok(file) = OpenOptions::new().read(true).write(true).open(path) else {
            return false;
        };
        // SAFETY: file.as_raw_fd() is valid for this call.
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret < 0 {
            return false;
        }
        drop(file);
        let _ = std::fs::remove_file(path);
        true
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test gets its own scratch directory rather than sharing
    // lock_dir(), so concurrent test runs never collide on a lock path.
    fn scratch_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zb_test.lock");
        (dir, path)
    }

    #[test]
    fn create_then_second_create_fails() {
        let (_dir, path) = scratch_path();
        let _a = Lock::create(&path).unwrap();
        let b = Lock::create(&path);
        assert!(matches!(b, Err(Error::ReaderAlreadyConnected)));
    }

    #[test]
    fn drop_removes_file_and_allows_recreate() {
        let (_dir, path) = scratch_path();
        let lock = Lock::create(&path).unwrap();
        drop(lock);
        assert!(!path.exists());
        let _c = Lock::create(&path).unwrap();
    }

    #[test]
    fn try_steal_succeeds_on_unheld_file() {
        let (_dir, path) = scratch_path();
        let lock = Lock::create(&path).unwrap();
        drop(lock);
        std::fs::File::create(&path).unwrap();
        assert!(Lock::try_steal(&path));
        assert!(!path.exists());
    }

    #[test]
    fn try_steal_fails_while_held() {
        let (_dir, path) = scratch_path();
        let _held = Lock::create(&path).unwrap();
        assert!(!Lock::try_steal(&path));
    }
}
