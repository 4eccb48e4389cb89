// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! The on-wire shared-memory layout: the Operation Info Exchange Block
//! (OIEB), the metadata block, and the payload ring. Everything here is
//! `#[repr(C)]` with explicit little-endian field widths so the layout
//! is stable across compilers and, in principle, across languages.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Round `value` up to the next multiple of [`crate::config::ALIGNMENT`].
pub fn align64(value: usize) -> usize {
    let a = crate::config::ALIGNMENT;
    (value + a - 1) / a * a
}

/// Byte offset of the metadata block, immediately after the OIEB.
pub fn metadata_offset() -> usize {
    crate::config::OIEB_SIZE
}

/// Byte offset of the payload ring, given the already-aligned metadata
/// block size.
pub fn payload_offset(metadata_size_aligned: usize) -> usize {
    metadata_offset() + metadata_size_aligned
}

/// Total shared-memory object size for a ring with the given aligned
/// metadata and payload sizes.
pub fn total_size(metadata_size_aligned: usize, payload_size_aligned: usize) -> usize {
    payload_offset(metadata_size_aligned) + payload_size_aligned
}

/// Protocol version carried in the OIEB header.
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;
pub const VERSION_PATCH: u8 = 0;

/// The Operation Info Exchange Block: the 128-byte control header at
/// offset 0 of every ring's shared-memory object.
///
/// Every field after `oieb_size`/`version` is mutated through atomic
/// operations with explicit `Acquire`/`Release` ordering; the actual
/// cross-process handoff is still done by the two named semaphores, the
/// atomics only make individual field reads/writes torn-free.
#[repr(C, align(64))]
pub struct Oieb {
    oieb_size: AtomicU32,
    version: AtomicU32,
    metadata_size: AtomicU64,
    metadata_free_bytes: AtomicU64,
    metadata_written_bytes: AtomicU64,
    payload_size: AtomicU64,
    payload_free_bytes: AtomicU64,
    payload_write_pos: AtomicU64,
    payload_read_pos: AtomicU64,
    payload_written_count: AtomicU64,
    payload_read_count: AtomicU64,
    writer_pid: AtomicU64,
    reader_pid: AtomicU64,
    _reserved: [u8; 32],
}

const _: () = assert!(std::mem::size_of::<Oieb>() == crate::config::OIEB_SIZE);

fn pack_version(major: u8, minor: u8, patch: u8) -> u32 {
    u32::from_le_bytes([major, minor, patch, 0])
}

impl Oieb {
    /// Initialise a freshly zeroed OIEB at ring creation time.
    pub fn init(&self, metadata_size: u64, payload_size: u64, reader_pid: u64) {
        self.oieb_size.store(crate::config::OIEB_SIZE as u32, Ordering::Relaxed);
        self.version.store(pack_version(VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH), Ordering::Relaxed);
        self.metadata_size.store(metadata_size, Ordering::Relaxed);
        self.metadata_free_bytes.store(metadata_size, Ordering::Relaxed);
        self.metadata_written_bytes.store(0, Ordering::Relaxed);
        self.payload_size.store(payload_size, Ordering::Relaxed);
        self.payload_free_bytes.store(payload_size, Ordering::Release);
        self.payload_write_pos.store(0, Ordering::Relaxed);
        self.payload_read_pos.store(0, Ordering::Relaxed);
        self.payload_written_count.store(0, Ordering::Relaxed);
        self.payload_read_count.store(0, Ordering::Relaxed);
        self.writer_pid.store(0, Ordering::Relaxed);
        self.reader_pid.store(reader_pid, Ordering::Release);
    }

    /// Validate the structural invariants required before trusting any
    /// other field: fixed size and major version.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        let size = self.oieb_size.load(Ordering::Relaxed);
        if size as usize != crate::config::OIEB_SIZE {
            return Err(Error::InvalidOieb(format!("unexpected oieb_size {size}")));
        }
        let version = self.version.load(Ordering::Relaxed).to_le_bytes();
        if version[0] != VERSION_MAJOR {
            return Err(Error::InvalidOieb(format!("unsupported major version {}", version[0])));
        }
        Ok(())
    }

    pub fn metadata_size(&self) -> u64 {
        self.metadata_size.load(Ordering::Relaxed)
    }

    pub fn metadata_free_bytes(&self) -> u64 {
        self.metadata_free_bytes.load(Ordering::Acquire)
    }

    pub fn metadata_written_bytes(&self) -> u64 {
        self.metadata_written_bytes.load(Ordering::Acquire)
    }

    pub fn set_metadata_written(&self, bytes: u64) {
        self.metadata_written_bytes.store(bytes, Ordering::Release);
        self.metadata_free_bytes.store(self.metadata_size() - bytes, Ordering::Release);
    }

    pub fn payload_size(&self) -> u64 {
        self.payload_size.load(Ordering::Relaxed)
    }

    pub fn payload_free_bytes(&self) -> u64 {
        self.payload_free_bytes.load(Ordering::Acquire)
    }

    pub fn set_payload_free_bytes(&self, value: u64) {
        self.payload_free_bytes.store(value, Ordering::Release);
    }

    pub fn add_payload_free_bytes(&self, delta: u64) {
        self.payload_free_bytes.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn sub_payload_free_bytes(&self, delta: u64) {
        self.payload_free_bytes.fetch_sub(delta, Ordering::AcqRel);
    }

    pub fn payload_write_pos(&self) -> u64 {
        self.payload_write_pos.load(Ordering::Relaxed)
    }

    pub fn set_payload_write_pos(&self, value: u64) {
        self.payload_write_pos.store(value, Ordering::Release);
    }

    pub fn payload_read_pos(&self) -> u64 {
        self.payload_read_pos.load(Ordering::Relaxed)
    }

    pub fn set_payload_read_pos(&self, value: u64) {
        self.payload_read_pos.store(value, Ordering::Release);
    }

    pub fn payload_written_count(&self) -> u64 {
        self.payload_written_count.load(Ordering::Acquire)
    }

    pub fn increment_payload_written_count(&self) {
        self.payload_written_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn payload_read_count(&self) -> u64 {
        self.payload_read_count.load(Ordering::Acquire)
    }

    pub fn increment_payload_read_count(&self) {
        self.payload_read_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn writer_pid(&self) -> u64 {
        self.writer_pid.load(Ordering::Acquire)
    }

    pub fn set_writer_pid(&self, pid: u64) {
        self.writer_pid.store(pid, Ordering::Release);
    }

    pub fn reader_pid(&self) -> u64 {
        self.reader_pid.load(Ordering::Acquire)
    }

    pub fn set_reader_pid(&self, pid: u64) {
        self.reader_pid.store(pid, Ordering::Release);
    }
}

/// Header preceding every record (frame or wrap marker) in the payload
/// ring.
#[repr(C)]
pub struct FrameHeader {
    pub payload_size: u64,
    pub sequence_number: u64,
}

impl FrameHeader {
    /// True when this header is a wrap marker ("jump to offset 0")
    /// rather than a real frame.
    pub fn is_wrap_marker(&self) -> bool {
        self.payload_size == 0
    }
}

/// Read a [`FrameHeader`] from `base + offset`.
///
/// # Safety
/// `base` must point to a mapping at least `offset + 16` bytes long.
pub unsafe fn read_header(base: *const u8, offset: usize) -> FrameHeader {
    let ptr = base.add(offset) as *const u64;
    FrameHeader {
        payload_size: u64::from_le(ptr.read_unaligned()),
        sequence_number: u64::from_le(ptr.add(1).read_unaligned()),
    }
}

/// Write a [`FrameHeader`] at `base + offset`.
///
/// # Safety
/// `base` must point to a mapping at least `offset + 16` bytes long and
/// the caller must hold exclusive write access to that region (only the
/// writer ever calls this).
pub unsafe fn write_header(base: *mut u8, offset: usize, header: &FrameHeader) {
    let ptr = base.add(offset) as *mut u64;
    ptr.write_unaligned(header.payload_size.to_le());
    ptr.add(1).write_unaligned(header.sequence_number.to_le());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oieb_is_exactly_128_bytes() {
        assert_eq!(std::mem::size_of::<Oieb>(), 128);
    }

    #[test]
    fn align64_rounds_up() {
        assert_eq!(align64(0), 0);
        assert_eq!(align64(1), 64);
        assert_eq!(align64(64), 64);
        assert_eq!(align64(65), 128);
    }

    #[test]
    fn header_roundtrip() {
        let mut buf = vec![0u8; 32];
        let header = FrameHeader { payload_size: 42, sequence_number: 7 };
        unsafe {
            write_header(buf.as_mut_ptr(), 8, &header);
            let read = read_header(buf.as_ptr(), 8);
            assert_eq!(read.payload_size, 42);
            assert_eq!(read.sequence_number, 7);
        }
    }

    #[test]
    fn wrap_marker_has_zero_payload_size() {
        let header = FrameHeader { payload_size: 0, sequence_number: 0 };
        assert!(header.is_wrap_marker());
    }
}
