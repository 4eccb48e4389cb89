// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Writer: connects to an existing ring, publishes metadata once, and
//! writes frames with wrap-around handling and reader-liveness checks.

use crate::config::{FRAME_HEADER_SIZE, METADATA_LENGTH_PREFIX_SIZE, WRITER_LIVENESS_WINDOW};
use crate::error::{Error, Result};
use crate::layout::{self, FrameHeader, Oieb};
use crate::platform::{self, pid, Sem, Shm};
use std::sync::atomic::{AtomicU64, Ordering};

/// Observability counters for a [`Writer`].
#[derive(Default)]
pub struct WriterMetrics {
    pub frames_written: AtomicU64,
    pub bytes_written: AtomicU64,
    pub wrap_events: AtomicU64,
    pub liveness_waits: AtomicU64,
}

/// Connects to a ring created by a [`crate::reader::Reader`] and writes
/// frames into it. Does not own the ring's lifetime: dropping a `Writer`
/// only clears `writer_pid`, it never removes shared memory or
/// semaphores.
pub struct Writer {
    name: String,
    shm: Shm,
    sem_w: Sem,
    sem_r: Sem,
    metadata_size: usize,
    payload_size: usize,
    payload_offset: usize,
    next_sequence: u64,
    metadata_written: bool,
    metrics: WriterMetrics,
    pending_write_pos: u64,
    pending_record_size: u64,
}

impl Writer {
    /// Connect to an existing ring named `name`.
    pub fn connect(name: &str) -> Result<Self> {
        platform::validate_name(name)?;

        let probe = Shm::open(name, crate::config::OIEB_SIZE)?;
        // SAFETY: probe is mapped with at least OIEB_SIZE bytes starting
        // with an Oieb by protocol convention.
        let oieb = unsafe { &*(probe.as_ptr() as *const Oieb) };
        oieb.validate()?;

        if oieb.reader_pid() == 0 || !pid::is_alive(oieb.reader_pid() as u32) {
            return Err(Error::NoReader);
        }
        if oieb.writer_pid() != 0 && pid::is_alive(oieb.writer_pid() as u32) {
            return Err(Error::WriterAlreadyConnected);
        }

        let metadata_size = oieb.metadata_size() as usize;
        let payload_size = oieb.payload_size() as usize;
        let payload_offset = layout::payload_offset(metadata_size);
        let total = layout::total_size(metadata_size, payload_size);
        let metadata_written = oieb.metadata_written_bytes() > 0;
        drop(probe);

        let shm = Shm::open(name, total)?;
        let sem_w = Sem::open(&platform::sem_w_name(name))?;
        let sem_r = Sem::open(&platform::sem_r_name(name))?;

        // SAFETY: shm is mapped with `total` bytes starting with an
        // Oieb.
        let oieb = unsafe { &*(shm.as_ptr() as *const Oieb) };
        oieb.set_writer_pid(pid::current() as u64);

        log::info!("writer connected to ring '{name}'");

        Ok(Self {
            name: name.to_string(),
            shm,
            sem_w,
            sem_r,
            metadata_size,
            payload_size,
            payload_offset,
            next_sequence: 1,
            metadata_written,
            metrics: WriterMetrics::default(),
            pending_write_pos: 0,
            pending_record_size: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &WriterMetrics {
        &self.metrics
    }

    fn oieb(&self) -> &Oieb {
        // SAFETY: shm is mapped with the full ring size computed at
        // connect() time, starting with an Oieb.
        unsafe { &*(self.shm.as_ptr() as *const Oieb) }
    }

    fn metadata_ptr(&self) -> *mut u8 {
        // SAFETY: metadata_offset() is within the mapping by
        // construction.
        unsafe { self.shm.as_ptr().add(layout::metadata_offset()) }
    }

    fn payload_base(&self) -> *mut u8 {
        // SAFETY: payload_offset is within the mapping by construction.
        unsafe { self.shm.as_ptr().add(self.payload_offset) }
    }

    pub fn is_reader_connected(&self) -> bool {
        let rp = self.oieb().reader_pid();
        rp != 0 && pid::is_alive(rp as u32)
    }

    /// Publish metadata for this ring. May be called at most once.
    pub fn set_metadata(&mut self, bytes: &[u8]) -> Result<()> {
        if self.metadata_written {
            return Err(Error::MetadataAlreadyWritten);
        }
        let total = bytes.len() + METADATA_LENGTH_PREFIX_SIZE;
        if total > self.metadata_size {
            return Err(Error::MetadataTooLarge { requested: total, capacity: self.metadata_size });
        }

        // SAFETY: metadata_ptr() covers metadata_size bytes, and `total`
        // was just checked to fit within it; no reader concurrently
        // writes this region (metadata is writer-exclusive).
        unsafe {
            let len_ptr = self.metadata_ptr() as *mut u64;
            len_ptr.write_unaligned((total as u64).to_le());
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.metadata_ptr().add(METADATA_LENGTH_PREFIX_SIZE),
                bytes.len(),
            );
        }

        self.oieb().set_metadata_written(total as u64);
        self.metadata_written = true;
        Ok(())
    }

    /// Write a frame, copying `bytes` into the ring.
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let (_, dest) = self.reserve(bytes.len())?;
        dest.copy_from_slice(bytes);
        self.commit(bytes.len() as u64);
        Ok(())
    }

    /// Reserve space for a frame of `size` bytes without copying;
    /// returns the assigned sequence number and a mutable slice to fill.
    /// The caller MUST call [`Writer::commit_frame`] with the same size
    /// before any other reservation.
    pub fn get_frame_buffer(&mut self, size: usize) -> Result<(u64, &mut [u8])> {
        self.reserve(size)
    }

    /// Commit a frame previously reserved via [`Writer::get_frame_buffer`].
    pub fn commit_frame(&mut self, size: usize) {
        self.commit(size as u64);
    }

    fn reserve(&mut self, size: usize) -> Result<(u64, &mut [u8])> {
        if size == 0 {
            return Err(Error::InvalidFrameSize);
        }
        let record_size = FRAME_HEADER_SIZE as u64 + size as u64;
        let ring_size = self.payload_size as u64;
        if record_size > ring_size {
            return Err(Error::FrameTooLarge { requested: size, capacity: self.payload_size - FRAME_HEADER_SIZE });
        }

        loop {
            if !self.is_reader_connected() {
                return Err(Error::ReaderDead);
            }

            let oieb = self.oieb();
            let write_pos = oieb.payload_write_pos();
            let read_pos = oieb.payload_read_pos();

            let fits = if write_pos >= read_pos {
                let tail = ring_size - write_pos;
                tail >= record_size || read_pos >= record_size
            } else {
                read_pos - write_pos >= record_size
            };
            if fits {
                break;
            }

            self.metrics.liveness_waits.fetch_add(1, Ordering::Relaxed);
            log::debug!("writer waiting for reader to free {record_size} bytes on '{}'", self.name);
            if !self.sem_r.wait(WRITER_LIVENESS_WINDOW)? && !self.is_reader_connected() {
                return Err(Error::ReaderDead);
            }
        }

        let oieb = self.oieb();
        let mut write_pos = oieb.payload_write_pos();
        let read_pos = oieb.payload_read_pos();

        if ring_size - write_pos < record_size && read_pos > 0 {
            let tail = ring_size - write_pos;
            if tail >= FRAME_HEADER_SIZE as u64 {
                // SAFETY: write_pos + 16 <= ring_size, checked by `tail`.
                unsafe {
                    layout::write_header(
                        self.payload_base(),
                        write_pos as usize,
                        &FrameHeader { payload_size: 0, sequence_number: 0 },
                    );
                }
                oieb.increment_payload_written_count();
            }
            oieb.sub_payload_free_bytes(tail);
            self.metrics.wrap_events.fetch_add(1, Ordering::Relaxed);
            write_pos = 0;
            oieb.set_payload_write_pos(0);
        }

        let sequence_number = self.next_sequence;
        // SAFETY: write_pos + record_size <= ring_size, established by
        // the wait loop and the wrap adjustment above.
        unsafe {
            layout::write_header(
                self.payload_base(),
                write_pos as usize,
                &FrameHeader { payload_size: size as u64, sequence_number },
            );
        }

        let data_offset = write_pos as usize + FRAME_HEADER_SIZE;
        // SAFETY: data_offset + size <= payload_offset + payload_size.
        let dest = unsafe { std::slice::from_raw_parts_mut(self.payload_base().add(data_offset), size) };

        self.pending_write_pos = write_pos;
        self.pending_record_size = record_size;

        Ok((sequence_number, dest))
    }

    fn commit(&mut self, size: u64) {
        let record_size = FRAME_HEADER_SIZE as u64 + size;
        debug_assert_eq!(record_size, self.pending_record_size);

        let oieb = self.oieb();
        let ring_size = self.payload_size as u64;
        let new_write_pos = (self.pending_write_pos + record_size) % ring_size;
        oieb.set_payload_write_pos(new_write_pos);
        oieb.sub_payload_free_bytes(record_size);
        oieb.increment_payload_written_count();
        self.next_sequence += 1;

        self.metrics.frames_written.fetch_add(1, Ordering::Relaxed);
        self.metrics.bytes_written.fetch_add(size, Ordering::Relaxed);

        if let Err(e) = self.sem_w.post() {
            log::error!("failed to post sem-w after committing frame on '{}': {}", self.name, e);
        }
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.oieb().set_writer_pid(0);
        log::info!("writer disconnected from ring '{}'", self.name);
    }
}
