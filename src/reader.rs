// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Reader: creates a ring, cleans up stale resources left by crashed
//! peers, and reads frames written by the writer.

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::layout::{self, Oieb};
use crate::platform::{self, lock, pid, Lock, Sem, Shm};
use crate::BufferConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Observability counters for a [`Reader`]. Exposed read-only via
/// [`Reader::metrics`]; not part of the wire protocol.
#[derive(Default)]
pub struct ReaderMetrics {
    pub frames_read: AtomicU64,
    pub bytes_read: AtomicU64,
    pub wrap_events: AtomicU64,
    pub stale_sweeps: AtomicU64,
    pub stale_resources_removed: AtomicU64,
}

impl ReaderMetrics {
    fn new() -> Self {
        Self::default()
    }
}

/// Owns a ring's shared memory, semaphores, and advisory lock for its
/// entire lifetime. Created once by whichever process sets the ring up;
/// torn down (shared memory, semaphores, and lock file all removed) on
/// drop.
pub struct Reader {
    name: String,
    shm: Shm,
    sem_w: Sem,
    sem_r: Sem,
    _lock: Lock,
    metadata_size: usize,
    payload_size: usize,
    payload_offset: usize,
    next_sequence: u64,
    fatal: bool,
    metrics: ReaderMetrics,
}

impl Reader {
    /// Create a new ring named `name` with the given geometry, sweeping
    /// stale resources from crashed prior readers first.
    pub fn create(name: &str, config: BufferConfig) -> Result<Self> {
        platform::validate_name(name)?;

        let swept = sweep_stale_resources();

        let metadata_size = layout::align64(config.metadata_size);
        let payload_size = layout::align64(config.payload_size);
        let payload_offset = layout::payload_offset(metadata_size);
        let total = layout::total_size(metadata_size, payload_size);

        let lock_path = lock::lock_path(name);
        let lock = Lock::create(&lock_path)?;

        let shm = match Shm::create(name, total) {
            Ok(shm) => shm,
            Err(Error::AlreadyExists(_)) => {
                Shm::remove(name)?;
                Shm::create(name, total)?
            }
            Err(e) => return Err(e),
        };

        let sem_w_name = platform::sem_w_name(name);
        let sem_r_name = platform::sem_r_name(name);
        // Stale semaphores may remain from a crashed reader; a create
        // that finds them already present is removed and recreated,
        // same as the shared-memory object above.
        let sem_w = match Sem::create(&sem_w_name, 0) {
            Ok(s) => s,
            Err(Error::AlreadyExists(_)) => {
                Sem::remove(&sem_w_name)?;
                Sem::create(&sem_w_name, 0)?
            }
            Err(e) => return Err(e),
        };
        let sem_r = match Sem::create(&sem_r_name, 0) {
            Ok(s) => s,
            Err(Error::AlreadyExists(_)) => {
                Sem::remove(&sem_r_name)?;
                Sem::create(&sem_r_name, 0)?
            }
            Err(e) => return Err(e),
        };

        let reader = Self {
            name: name.to_string(),
            shm,
            sem_w,
            sem_r,
            _lock: lock,
            metadata_size,
            payload_size,
            payload_offset,
            next_sequence: 1,
            fatal: false,
            metrics: ReaderMetrics::new(),
        };
        reader.oieb().init(metadata_size as u64, payload_size as u64, pid::current() as u64);

        reader.metrics.stale_sweeps.fetch_add(1, Ordering::Relaxed);
        reader.metrics.stale_resources_removed.fetch_add(swept as u64, Ordering::Relaxed);
        log::info!("reader created ring '{}' ({} bytes payload)", name, payload_size);

        Ok(reader)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &ReaderMetrics {
        &self.metrics
    }

    fn oieb(&self) -> &Oieb {
        // SAFETY: shm is mapped with at least OIEB_SIZE bytes and starts
        // with an Oieb by construction (create()/the writer's validated
        // layout); Oieb requires 64-byte alignment, which mmap satisfies.
        unsafe { &*(self.shm.as_ptr() as *const Oieb) }
    }

    fn metadata_ptr(&self) -> *const u8 {
        // SAFETY: offset layout::metadata_offset() is within the mapping
        // by construction (total size includes the metadata block).
        unsafe { self.shm.as_ptr().add(layout::metadata_offset()) }
    }

    /// Metadata published by the writer, or an empty slice if none has
    /// been written yet.
    pub fn metadata(&self) -> &[u8] {
        let written = self.oieb().metadata_written_bytes() as usize;
        if written == 0 {
            return &[];
        }
        // SAFETY: metadata_ptr() + 8 is within the mapped metadata block
        // because written <= metadata_size and metadata_size bytes follow
        // the 8-byte length prefix by construction.
        unsafe {
            std::slice::from_raw_parts(self.metadata_ptr().add(8), written - 8)
        }
    }

    /// True iff a writer is currently attached and alive.
    pub fn is_writer_connected(&self) -> bool {
        let wp = self.oieb().writer_pid();
        wp != 0 && pid::is_alive(wp as u32)
    }

    /// Block until `is_writer_connected()` or `timeout` elapses.
    pub fn wait_for_writer(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.is_writer_connected() {
                return true;
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Block until the next frame is available or `timeout` elapses.
    /// Returns `Ok(None)` on timeout, never on error.
    pub fn read_frame(&mut self, timeout: Duration) -> Result<Option<Frame<'_>>> {
        if self.fatal {
            return Err(Error::InvalidOieb("reader is in a fatal state".into()));
        }

        if !self.sem_w.wait(timeout)? {
            let wp = self.oieb().writer_pid();
            if wp != 0 && !pid::is_alive(wp as u32) {
                self.fatal = true;
                log::error!("writer pid {wp} is dead while reader blocked on frame availability");
                return Err(Error::WriterDead);
            }
            return Ok(None);
        }

        let writer_pid = self.oieb().writer_pid();
        let written_count = self.oieb().payload_written_count();
        let read_count = self.oieb().payload_read_count();
        if writer_pid == 0 && written_count <= read_count {
            self.fatal = true;
            log::info!("writer exited gracefully and all frames have been drained");
            return Err(Error::WriterDead);
        }

        let ring_size = self.payload_size as u64;
        let mut read_pos = self.oieb().payload_read_pos();

        if ring_size - read_pos < crate::config::FRAME_HEADER_SIZE as u64 {
            // The writer leaves a tail too small to hold a header as
            // pure waste instead of writing a marker into it (see
            // reserve() in writer.rs); mirror that here by freeing the
            // waste and resetting to offset 0 without touching
            // payload_read_count, since no record was ever written at
            // this offset to account for. Reading a header from this
            // tail would run past the ring's declared region.
            let wasted = ring_size - read_pos;
            self.oieb().add_payload_free_bytes(wasted);
            self.metrics.wrap_events.fetch_add(1, Ordering::Relaxed);
            read_pos = 0;
            self.oieb().set_payload_read_pos(0);
        }

        // SAFETY: read_pos + FRAME_HEADER_SIZE <= ring_size, checked
        // above, and this mapping covers
        // payload_offset..payload_offset+payload_size.
        let mut header = unsafe { layout::read_header(self.payload_base(), read_pos as usize) };

        if header.is_wrap_marker() {
            let wasted = ring_size - read_pos;
            self.oieb().add_payload_free_bytes(wasted);
            self.oieb().increment_payload_read_count();
            self.metrics.wrap_events.fetch_add(1, Ordering::Relaxed);
            read_pos = 0;
            self.oieb().set_payload_read_pos(0);
            // SAFETY: offset 0 is within the payload region.
            header = unsafe { layout::read_header(self.payload_base(), 0) };
        }

        if header.sequence_number != self.next_sequence {
            self.fatal = true;
            log::error!(
                "sequence mismatch on ring '{}': expected {}, got {}",
                self.name, self.next_sequence, header.sequence_number
            );
            return Err(Error::SequenceError { expected: self.next_sequence, got: header.sequence_number });
        }

        if header.payload_size == 0 {
            self.fatal = true;
            return Err(Error::InvalidOieb("zero-length frame with nonzero sequence".into()));
        }

        let record_size = crate::config::FRAME_HEADER_SIZE as u64 + header.payload_size;
        if read_pos + record_size > ring_size {
            self.fatal = true;
            log::error!("frame at offset {read_pos} of size {record_size} overruns the ring");
            return Err(Error::InvalidOieb("frame overruns ring bounds".into()));
        }

        let data_offset = read_pos as usize + crate::config::FRAME_HEADER_SIZE;
        // SAFETY: data_offset + header.payload_size <= payload_offset +
        // payload_size, checked above.
        let data = unsafe {
            std::slice::from_raw_parts(self.payload_base().add(data_offset), header.payload_size as usize)
        };

        let new_read_pos = (read_pos + record_size) % ring_size;
        self.oieb().set_payload_read_pos(new_read_pos);
        self.oieb().increment_payload_read_count();
        self.next_sequence += 1;

        self.metrics.frames_read.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_read.fetch_add(header.payload_size, Ordering::Relaxed);

        Ok(Some(Frame::new(data, header.sequence_number, record_size, self.oieb(), &self.sem_r)))
    }

    fn payload_base(&self) -> *mut u8 {
        // SAFETY: payload_offset is within the mapping by construction.
        unsafe { self.shm.as_ptr().add(self.payload_offset) }
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.oieb().set_reader_pid(0);
        let name = self.name.clone();
        if let Err(e) = Sem::remove(&platform::sem_w_name(&name)) {
            log::warn!("failed to remove sem-w for '{name}': {e}");
        }
        if let Err(e) = Sem::remove(&platform::sem_r_name(&name)) {
            log::warn!("failed to remove sem-r for '{name}': {e}");
        }
        if let Err(e) = Shm::remove(&name) {
            log::warn!("failed to remove shared memory for '{name}': {e}");
        }
        log::info!("reader tore down ring '{name}'");
    }
}

/// Scan the lock directory for stale readers: steal any lock whose
/// owner is gone, then remove the associated shared memory and
/// semaphores if both writer and reader pids are dead. Returns the
/// number of rings actually cleaned up. Errors encountered per-candidate
/// are swallowed; this is best-effort housekeeping, not a correctness
/// requirement.
fn sweep_stale_resources() -> usize {
    let dir = lock::lock_dir();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(buffer_name) = file_name.strip_suffix(".lock") else {
            continue;
        };

        if !Lock::try_steal(&path) {
            continue;
        }
        log::debug!("stole stale lock for ring '{buffer_name}'");

        let Ok(shm) = Shm::open(buffer_name, crate::config::OIEB_SIZE) else {
            continue;
        };
        // SAFETY: shm is mapped with OIEB_SIZE bytes starting with an
        // Oieb by protocol convention.
        let oieb = unsafe { &*(shm.as_ptr() as *const Oieb) };
        let writer_dead = oieb.writer_pid() == 0 || !pid::is_alive(oieb.writer_pid() as u32);
        let reader_dead = oieb.reader_pid() == 0 || !pid::is_alive(oieb.reader_pid() as u32);
        drop(shm);

        if writer_dead && reader_dead {
            let _ = Shm::remove(buffer_name);
            let _ = Sem::remove(&platform::sem_w_name(buffer_name));
            let _ = Sem::remove(&platform::sem_r_name(buffer_name));
            log::info!("removed stale ring '{buffer_name}'");
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name() -> String {
        format!("zb_test_reader_{}_{}", std::process::id(), fastrand::u64(..))
    }

    #[test]
    fn create_initializes_oieb() {
        let name = unique_name();
        let reader = Reader::create(&name, BufferConfig { metadata_size: 1024, payload_size: 10240 }).unwrap();
        let oieb = reader.oieb();
        assert_eq!(oieb.payload_size(), layout::align64(10240) as u64);
        assert_eq!(oieb.payload_free_bytes(), layout::align64(10240) as u64);
        assert_eq!(oieb.reader_pid(), pid::current() as u64);
    }

    #[test]
    fn read_frame_times_out_without_writer() {
        let name = unique_name();
        let mut reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 1024 }).unwrap();
        let result = reader.read_frame(Duration::from_millis(20)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn metadata_is_empty_before_any_write() {
        let name = unique_name();
        let reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 1024 }).unwrap();
        assert_eq!(reader.metadata(), &[] as &[u8]);
    }
}
