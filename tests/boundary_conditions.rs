// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Boundary and protocol-violation scenarios: oversized frames, metadata
//! written twice, invalid names, and a writer blocking on a full ring
//! until the reader frees space.

use std::sync::atomic::Ordering;
use std::time::Duration;
use zerobuffer::{BufferConfig, Error, Reader, Writer};

mod support;
use support::{init_logging, unique_name};

#[test]
fn frame_larger_than_ring_capacity_is_rejected() {
    init_logging();
    let name = unique_name("frame-too-large");
    let _reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 128 }).unwrap();
    let mut writer = Writer::connect(&name).unwrap();

    let result = writer.write_frame(&[0u8; 4096]);
    assert!(matches!(result, Err(Error::FrameTooLarge { .. })));
}

#[test]
fn empty_frame_is_rejected() {
    init_logging();
    let name = unique_name("empty-frame");
    let _reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 1024 }).unwrap();
    let mut writer = Writer::connect(&name).unwrap();

    let result = writer.write_frame(&[]);
    assert!(matches!(result, Err(Error::InvalidFrameSize)));
}

#[test]
fn metadata_can_only_be_written_once() {
    init_logging();
    let name = unique_name("metadata-once");
    let _reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 1024 }).unwrap();
    let mut writer = Writer::connect(&name).unwrap();

    writer.set_metadata(b"first").unwrap();
    let result = writer.set_metadata(b"second");
    assert!(matches!(result, Err(Error::MetadataAlreadyWritten)));
}

#[test]
fn metadata_larger_than_block_is_rejected() {
    init_logging();
    let name = unique_name("metadata-too-large");
    let _reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 1024 }).unwrap();
    let mut writer = Writer::connect(&name).unwrap();

    let result = writer.set_metadata(&vec![0u8; 4096]);
    assert!(matches!(result, Err(Error::MetadataTooLarge { .. })));
}

#[test]
fn names_with_control_characters_are_rejected() {
    init_logging();
    let result = Reader::create("bad\tname", BufferConfig { metadata_size: 64, payload_size: 1024 });
    assert!(matches!(result, Err(Error::InvalidName(_))));
}

#[test]
fn tail_shorter_than_a_header_is_consumed_as_pure_waste() {
    init_logging();
    let name = unique_name("short-tail-wrap");
    let mut reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 64 }).unwrap();
    let mut writer = Writer::connect(&name).unwrap();

    // 64-byte ring. Frame 1 (8-byte payload, 24-byte record) occupies
    // [0, 24) and is read immediately so read_pos advances past 0.
    writer.write_frame(&[1u8; 8]).unwrap();
    let first = reader.read_frame(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(&first[..], &[1u8; 8]);
    drop(first);

    // Frame 2 (14-byte payload, 30-byte record) occupies [24, 54), the
    // remaining tail is now 64 - 54 = 10 bytes: too small to hold a
    // 16-byte frame header.
    writer.write_frame(&[2u8; 14]).unwrap();

    // Frame 3 (4-byte payload, 20-byte record) no longer fits in that
    // 10-byte tail, so the writer resets to offset 0 without writing a
    // wrap-marker header there (reserve()'s tail < FRAME_HEADER_SIZE
    // branch in writer.rs).
    writer.write_frame(&[3u8; 4]).unwrap();
    assert_eq!(writer.metrics().wrap_events.load(Ordering::Relaxed), 1);

    let second = reader.read_frame(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(&second[..], &[2u8; 14]);
    drop(second);

    // Reading past the 10-byte waste tail must detect the implicit wrap
    // by offset alone, not by reading a (nonexistent) header there.
    let third = reader.read_frame(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(&third[..], &[3u8; 4]);
    assert_eq!(third.sequence_number(), 3);
    drop(third);

    assert_eq!(reader.metrics().wrap_events.load(Ordering::Relaxed), 1);
}

#[test]
fn writer_blocks_until_reader_frees_space_then_proceeds() {
    init_logging();
    let name = unique_name("blocks-until-free");
    let mut reader = Reader::create(&name, BufferConfig { metadata_size: 64, payload_size: 64 }).unwrap();
    let mut writer = Writer::connect(&name).unwrap();

    // 64-byte ring, 16-byte header: a single 40-byte frame consumes the
    // whole ring. The next reservation must block until the first frame
    // is read and dropped.
    writer.write_frame(&[1u8; 40]).unwrap();

    let writer_thread = std::thread::spawn(move || {
        writer.write_frame(&[2u8; 40]).unwrap();
        writer
    });

    std::thread::sleep(Duration::from_millis(50));
    let first = reader.read_frame(Duration::from_secs(1)).unwrap().unwrap();
    assert_eq!(&first[..], &[1u8; 40]);
    drop(first);

    let _writer = writer_thread.join().unwrap();
    let second = reader.read_frame(Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(&second[..], &[2u8; 40]);
}
