// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! POSIX platform primitives: named shared memory, named semaphores, an
//! advisory file lock, and process-liveness probes. Everything above
//! this module talks to these four primitives and never touches `libc`
//! directly.

pub mod lock;
pub mod pid;
pub mod sem;
pub mod shm;

pub use lock::Lock;
pub use sem::Sem;
pub use shm::Shm;

/// Semaphore name for "data available", posted by the writer.
pub fn sem_w_name(buffer_name: &str) -> String {
    format!("sem-w-{buffer_name}")
}

/// Semaphore name for "space available", posted by the reader (on frame
/// release).
pub fn sem_r_name(buffer_name: &str) -> String {
    format!("sem-r-{buffer_name}")
}

/// Validate a buffer name against the protocol's naming convention:
/// non-empty, printable ASCII, and bounded in length.
pub fn validate_name(name: &str) -> crate::error::Result<()> {
    use crate::error::Error;
    if name.is_empty() {
        return Err(Error::InvalidName("name must not be empty".into()));
    }
    if name.len() > crate::config::MAX_NAME_LENGTH {
        return Err(Error::InvalidName(format!(
            "name longer than {} characters",
            crate::config::MAX_NAME_LENGTH
        )));
    }
    if !name.chars().all(|c| c.is_ascii_graphic()) {
        return Err(Error::InvalidName("name must be printable ASCII".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn rejects_non_printable() {
        assert!(validate_name("foo\nbar").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(crate::config::MAX_NAME_LENGTH + 1);
        assert!(validate_name(&long).is_err());
    }

    #[test]
    fn accepts_reasonable_name() {
        assert!(validate_name("my-buffer_01").is_ok());
    }
}
