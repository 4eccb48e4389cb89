// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Named POSIX counting semaphores via `sem_open`.
//!
//! Two of these back every ring: `sem-w-{name}` signals "data available",
//! `sem-r-{name}` signals "space available". Counts may coalesce under
//! contention; callers must always re-check shared state after a
//! successful wait rather than trust the count alone.

use crate::error::{Error, Result};
use std::ffi::CString;
use std::io;
use std::time::Duration;

pub struct Sem {
    handle: *mut libc::sem_t,
    name: String,
}

// SAFETY: sem_t is designed for cross-process/cross-thread use; all
// mutation happens through the sem_* syscalls which are internally
// synchronized by the kernel.
unsafe impl Send for Sem {}
unsafe impl Sync for Sem {}

fn sem_path(name: &str) -> Result<CString> {
    CString::new(format!("/{name}")).map_err(|_| Error::InvalidName(name.to_string()))
}

impl Sem {
    /// Create a named semaphore with the given initial count. Fails with
    /// [`Error::AlreadyExists`] if the name is already in use.
    pub fn create(name: &str, initial_value: u32) -> Result<Self> {
        let c_name = sem_path(name)?;

        // SAFETY: c_name is a valid NUL-terminated string; O_CREAT|O_EXCL
        // fails atomically instead of reopening a stale semaphore left
        // over from a crashed process.
        let handle = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                crate::config::SHM_FILE_MODE as libc::c_uint,
                initial_value as libc::c_uint,
            )
        };

        if handle == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::AlreadyExists {
                return Err(Error::AlreadyExists(name.to_string()));
            }
            return Err(err.into());
        }

        Ok(Self { handle, name: name.to_string() })
    }

    /// Open an existing named semaphore.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = sem_path(name)?;

        // SAFETY: c_name is valid; flags 0 opens an existing semaphore
        // without creating one.
        let handle = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if handle == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(Error::NotFound(name.to_string()));
            }
            return Err(err.into());
        }

        Ok(Self { handle, name: name.to_string() })
    }

    /// Remove a named semaphore. Idempotent.
    pub fn remove(name: &str) -> Result<()> {
        let c_name = sem_path(name)?;
        // SAFETY: c_name is valid; sem_unlink only affects the semaphore
        // namespace.
        let ret = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Block until the semaphore is signalled or `timeout` elapses.
    /// Returns `true` if signalled, `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        let deadline = now_plus(timeout);
        loop {
            // SAFETY: self.handle is a valid sem_t* for the lifetime of
            // self; deadline is a well-formed absolute CLOCK_REALTIME
            // timespec.
            let ret = unsafe { libc::sem_timedwait(self.handle, &deadline) };
            if ret == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ETIMEDOUT) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(err.into()),
            }
        }
    }

    /// Increment the semaphore, waking one waiter if any is blocked.
    pub fn post(&self) -> Result<()> {
        // SAFETY: self.handle is a valid sem_t* for the lifetime of self.
        if unsafe { libc::sem_post(self.handle) } < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn now_plus(timeout: Duration) -> libc::timespec {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: ts is a valid out-pointer for clock_gettime.
    unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
    let mut nsec = ts.tv_nsec as i64 + timeout.subsec_nanos() as i64;
    let mut sec = ts.tv_sec + timeout.as_secs() as libc::time_t;
    if nsec >= 1_000_000_000 {
        nsec -= 1_000_000_000;
        sec += 1;
    }
    libc::timespec { tv_sec: sec, tv_nsec: nsec }
}

impl Drop for Sem {
    fn drop(&mut self) {
        // SAFETY: self.handle is a valid sem_t* obtained from sem_open
        // and has not been closed before.
        unsafe {
            libc::sem_close(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name() -> String {
        format!("zb_test_sem_{}_{}", std::process::id(), fastrand::u64(..))
    }

    #[test]
    fn post_then_wait_succeeds_immediately() {
        let name = unique_name();
        let sem = Sem::create(&name, 0).unwrap();
        sem.post().unwrap();
        assert!(sem.wait(Duration::from_millis(100)).unwrap());
        Sem::remove(&name).unwrap();
    }

    #[test]
    fn wait_times_out_without_post() {
        let name = unique_name();
        let sem = Sem::create(&name, 0).unwrap();
        assert!(!sem.wait(Duration::from_millis(50)).unwrap());
        Sem::remove(&name).unwrap();
    }

    #[test]
    fn create_twice_fails() {
        let name = unique_name();
        let _a = Sem::create(&name, 0).unwrap();
        let b = Sem::create(&name, 0);
        assert!(matches!(b, Err(Error::AlreadyExists(_))));
        Sem::remove(&name).unwrap();
    }
}
