// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Closed error taxonomy for the ZeroBuffer protocol.
//!
//! Every fallible operation across platform primitives, the shared layout,
//! reader, writer, and duplex core reports through this single enum so
//! callers can match on recovery class (transient, peer death, protocol,
//! usage, system) without juggling per-module error types.

/// All errors that can occur while creating, connecting to, or operating a
/// ZeroBuffer ring.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Naming / Validation Errors
    // ========================================================================
    /// Buffer name failed the naming convention check (empty, non-printable,
    /// or longer than the platform-safe bound).
    InvalidName(String),

    // ========================================================================
    // Connection Lifecycle Errors
    // ========================================================================
    /// `Writer::connect` could not find a ring with this name.
    BufferNotFound(String),
    /// `Reader::create` found a live reader already attached.
    ReaderAlreadyConnected,
    /// `Writer::connect` found a live writer already attached.
    WriterAlreadyConnected,
    /// `Writer::connect` found no live reader attached.
    NoReader,
    /// The reader process is no longer alive.
    ReaderDead,
    /// The writer process is no longer alive (or exited gracefully and all
    /// of its frames have been drained).
    WriterDead,

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// A write was attempted with a zero-length payload.
    InvalidFrameSize,
    /// A write was attempted whose total record size exceeds the ring's
    /// payload capacity; it could never fit even on an empty ring.
    FrameTooLarge { requested: usize, capacity: usize },
    /// The ring has no more room for the requested record and the reader
    /// is not expected to free any soon (bounded-wait APIs only).
    BufferFull,
    /// A frame header read from the ring did not carry the expected
    /// sequence number; the ring is corrupted or out of sync.
    SequenceError { expected: u64, got: u64 },
    /// The OIEB failed one of its structural invariants on open.
    InvalidOieb(String),

    // ========================================================================
    // Metadata Errors
    // ========================================================================
    /// `set_metadata` / `commit_metadata` was called a second time.
    MetadataAlreadyWritten,
    /// Metadata payload plus its length prefix does not fit in the
    /// configured metadata block.
    MetadataTooLarge { requested: usize, capacity: usize },

    // ========================================================================
    // System Errors
    // ========================================================================
    /// The requested resource already exists (shared memory, semaphore, or
    /// lock file created twice).
    AlreadyExists(String),
    /// The requested resource does not exist.
    NotFound(String),
    /// The operation was denied by the OS (permissions, SELinux, etc.).
    PermissionDenied(String),
    /// A blocking wait exceeded its deadline without the awaited resource
    /// becoming available and no more specific error applies.
    Timeout,
    /// An underlying OS call failed; the wrapped error carries `errno`.
    System(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidName(name) => write!(f, "invalid buffer name: {}", name),
            Error::BufferNotFound(name) => write!(f, "buffer not found: {}", name),
            Error::ReaderAlreadyConnected => write!(f, "a reader is already connected"),
            Error::WriterAlreadyConnected => write!(f, "a writer is already connected"),
            Error::NoReader => write!(f, "no reader is connected"),
            Error::ReaderDead => write!(f, "reader process is no longer alive"),
            Error::WriterDead => write!(f, "writer process is no longer alive"),
            Error::InvalidFrameSize => write!(f, "frame payload must be non-empty"),
            Error::FrameTooLarge { requested, capacity } => write!(
                f,
                "frame of {} bytes cannot fit in a ring of {} bytes capacity",
                requested, capacity
            ),
            Error::BufferFull => write!(f, "ring has no free space for this write"),
            Error::SequenceError { expected, got } => {
                write!(f, "sequence mismatch: expected {}, got {}", expected, got)
            }
            Error::InvalidOieb(msg) => write!(f, "invalid OIEB: {}", msg),
            Error::MetadataAlreadyWritten => write!(f, "metadata has already been written"),
            Error::MetadataTooLarge { requested, capacity } => write!(
                f,
                "metadata of {} bytes does not fit in a block of {} bytes",
                requested, capacity
            ),
            Error::AlreadyExists(name) => write!(f, "resource already exists: {}", name),
            Error::NotFound(name) => write!(f, "resource not found: {}", name),
            Error::PermissionDenied(name) => write!(f, "permission denied: {}", name),
            Error::Timeout => write!(f, "operation timed out"),
            Error::System(e) => write!(f, "system error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::System(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::AlreadyExists => Error::AlreadyExists(e.to_string()),
            std::io::ErrorKind::NotFound => Error::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(e.to_string()),
            std::io::ErrorKind::TimedOut => Error::Timeout,
            _ => Error::System(e),
        }
    }
}

/// Convenient alias for API results using the crate's `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
