// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Process liveness probes used for peer-death detection.

/// The current process id.
pub fn current() -> u32 {
    std::process::id()
}

/// Returns true if a process with the given pid exists and is not a
/// zombie. `pid == 0` is always considered dead (the protocol reserves 0
/// for "no peer attached").
pub fn is_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    // SAFETY: kill with signal 0 performs no action besides the existence
    // and permission checks; pid is a plausible process id.
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if ret == 0 {
        return !is_zombie(pid);
    }
    let err = std::io::Error::last_os_error();
    // EPERM means the process exists but we lack permission to signal
    // it, which still counts as "alive" for liveness purposes.
    err.raw_os_error() == Some(libc::EPERM)
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // Field 3 (after the "(comm)" parenthesised group, which may itself
    // contain spaces) is the process state; 'Z' marks a zombie.
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|state| state == "Z")
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_alive(current()));
    }

    #[test]
    fn zero_pid_is_dead() {
        assert!(!is_alive(0));
    }

    #[test]
    fn implausible_pid_is_dead() {
        assert!(!is_alive(u32::MAX - 1));
    }
}
