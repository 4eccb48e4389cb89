// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Tunable constants for the ZeroBuffer protocol.
//!
//! These are the knobs the core algorithms in [`crate::reader`] and
//! [`crate::writer`] close over. They are compile-time constants rather
//! than a runtime config object: a ring's geometry is fixed at creation
//! time and there is no notion of hot-reloading protocol timings.

use std::time::Duration;

/// Size in bytes of the Operation Info Exchange Block. Fixed by the wire
/// format; never change without bumping the major version.
pub const OIEB_SIZE: usize = 128;

/// Alignment, in bytes, required for the OIEB, metadata block, and payload
/// ring start offsets.
pub const ALIGNMENT: usize = 64;

/// Size in bytes of a frame header (payload_size + sequence_number).
pub const FRAME_HEADER_SIZE: usize = 16;

/// Length prefix size in bytes for the metadata block.
pub const METADATA_LENGTH_PREFIX_SIZE: usize = 8;

/// Maximum length, in bytes, of a buffer name once validated. Chosen to
/// leave headroom under both `NAME_MAX` (255) and Win32 `MAX_PATH` once
/// prefixed with `/`, `sem-w-`, `sem-r-`, or the lock-file path.
pub const MAX_NAME_LENGTH: usize = 200;

/// How long a writer reservation blocks on `sem-r` before re-checking
/// reader liveness. Not a caller-visible deadline: the writer loops
/// through this window until the reservation fits or the reader is dead.
pub const WRITER_LIVENESS_WINDOW: Duration = Duration::from_secs(5);

/// Poll interval used by the duplex server while retrying its connection
/// to the response ring.
pub const DUPLEX_CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Total time the duplex server spends retrying its connection to the
/// response ring before giving up.
pub const DUPLEX_CONNECT_RETRY_BUDGET: Duration = Duration::from_secs(5);

/// Timeout the duplex server loop uses for each `read_frame` call while
/// polling for the shutdown flag.
pub const DUPLEX_SERVER_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Platform temp directory subdirectory that holds advisory lock files.
pub const LOCK_DIR_NAME: &str = "zerobuffer";

/// File mode applied to newly created shared-memory objects: readable and
/// writable within the same UID, matching the protocol's "same user"
/// trust model.
pub const SHM_FILE_MODE: u32 = 0o666;
