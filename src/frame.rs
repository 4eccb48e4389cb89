// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! The zero-copy frame handle returned by [`crate::reader::Reader::read_frame`].

use crate::layout::Oieb;
use crate::platform::Sem;
use std::ops::Deref;

/// A borrow over one frame's payload bytes inside the ring. Dropping the
/// handle is the only way to release those bytes back to the writer:
/// the record's total size is added to `payload_free_bytes` and `sem-r`
/// is posted exactly once.
///
/// Applications should drop frames promptly; the writer cannot reuse
/// this frame's space until they do.
pub struct Frame<'a> {
    data: &'a [u8],
    sequence_number: u64,
    record_size: u64,
    oieb: &'a Oieb,
    sem_r: &'a Sem,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        data: &'a [u8],
        sequence_number: u64,
        record_size: u64,
        oieb: &'a Oieb,
        sem_r: &'a Sem,
    ) -> Self {
        Self { data, sequence_number, record_size, oieb, sem_r }
    }

    /// The 1-based sequence number assigned by the writer.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// The frame's payload bytes.
    pub fn data(&self) -> &[u8] {
        self.data
    }
}

impl Deref for Frame<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.oieb.add_payload_free_bytes(self.record_size);
        if let Err(e) = self.sem_r.post() {
            log::warn!("failed to post sem-r releasing frame {}: {}", self.sequence_number, e);
        }
    }
}
