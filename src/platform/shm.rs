// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! POSIX shared memory wrapper: `shm_open`, `ftruncate`, `mmap`.
//!
//! A [`Shm`] owns a single mapping of a named POSIX shared memory object.
//! Dropping it only unmaps the region; removing the object from the
//! system is a separate, explicit operation ([`Shm::remove`]) since
//! whoever created the ring is responsible for tearing it down, not
//! every process that happens to hold a mapping.

use crate::error::{Error, Result};
use std::ffi::CString;
use std::io;
use std::ptr;

/// A mapped POSIX shared memory region.
pub struct Shm {
    ptr: *mut u8,
    size: usize,
    name: String,
}

// SAFETY: the mapped region is shared across processes by construction;
// all cross-process synchronization happens through the OIEB's atomic
// fields and the two named semaphores, not through Rust's aliasing rules.
unsafe impl Send for Shm {}
unsafe impl Sync for Shm {}

fn shm_path(name: &str) -> Result<CString> {
    CString::new(format!("/{name}")).map_err(|_| Error::InvalidName(name.to_string()))
}

impl Shm {
    /// Create a new shared-memory object named `name`, sized `size` bytes,
    /// zero-initialised. Fails with [`Error::AlreadyExists`] if an object
    /// with this name already exists.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let c_name = shm_path(name)?;

        // SAFETY: c_name is a valid NUL-terminated string; O_CREAT|O_EXCL
        // makes shm_open atomically fail if the object already exists
        // instead of silently reusing stale memory. Mode bits are a valid
        // permission mask.
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                crate::config::SHM_FILE_MODE as libc::mode_t,
            )
        };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::AlreadyExists {
                return Err(Error::AlreadyExists(name.to_string()));
            }
            return Err(err.into());
        }

        // SAFETY: fd is the valid descriptor returned above; size fits in
        // off_t on all supported platforms for the ring sizes this
        // protocol targets.
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is still open and was never passed elsewhere.
            unsafe { libc::close(fd) };
            return Err(err.into());
        }

        let ptr = map(fd, size)?;
        // SAFETY: fd is valid; mmap already holds its own reference to
        // the underlying object, so closing the descriptor here does not
        // invalidate the mapping.
        unsafe { libc::close(fd) };

        // SAFETY: ptr was just mapped PROT_WRITE over exactly `size`
        // bytes and no other reference to it exists yet.
        unsafe { ptr::write_bytes(ptr, 0, size) };

        Ok(Self { ptr, size, name: name.to_string() })
    }

    /// Open an existing shared-memory object named `name`, mapping `size`
    /// bytes. Fails with [`Error::NotFound`] if it does not exist.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        let c_name = shm_path(name)?;

        // SAFETY: c_name is valid; O_RDWR opens an existing object without
        // creating one.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(Error::BufferNotFound(name.to_string()));
            }
            return Err(err.into());
        }

        let ptr = map(fd, size)?;
        // SAFETY: see create().
        unsafe { libc::close(fd) };

        Ok(Self { ptr, size, name: name.to_string() })
    }

    /// Remove a shared-memory object by name. Idempotent: removing a
    /// name that does not exist is not an error.
    pub fn remove(name: &str) -> Result<()> {
        let c_name = shm_path(name)?;
        // SAFETY: c_name is valid; shm_unlink only touches the shm
        // namespace, not any live mapping.
        let ret = unsafe { libc::shm_unlink(c_name.as_ptr()) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Returns true if a shared-memory object named `name` currently
    /// exists.
    pub fn exists(name: &str) -> bool {
        let Ok(c_name) = shm_path(name) else { return false };
        // SAFETY: c_name is valid; O_RDONLY performs a read-only probe.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
        if fd >= 0 {
            // SAFETY: fd is valid and owned exclusively by this probe.
            unsafe { libc::close(fd) };
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn map(fd: libc::c_int, size: usize) -> Result<*mut u8> {
    // SAFETY: fd is a valid descriptor for an object at least `size`
    // bytes long (ftruncate'd by the creator); MAP_SHARED makes writes
    // visible to every process mapping the same object.
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error().into());
    }
    Ok(ptr as *mut u8)
}

impl Drop for Shm {
    fn drop(&mut self) {
        // SAFETY: self.ptr/self.size come from a successful mmap in
        // create() or open() and have not been unmapped before.
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.size);
        }
    }
}
