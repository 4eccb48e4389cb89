// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! # ZeroBuffer - zero-copy inter-process communication
//!
//! A single-producer/single-consumer ring buffer over named POSIX shared
//! memory, synchronized by two named counting semaphores and guarded by
//! an advisory file lock. One writer and one reader, in any process,
//! exchange frames without a copy through the kernel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zerobuffer::{BufferConfig, Reader, Writer, Result};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let config = BufferConfig { metadata_size: 4096, payload_size: 10 * 1024 * 1024 };
//!     let mut reader = Reader::create("example-channel", config)?;
//!     let mut writer = Writer::connect("example-channel")?;
//!
//!     writer.write_frame(b"hello")?;
//!     if let Some(frame) = reader.read_frame(Duration::from_secs(1))? {
//!         assert_eq!(&frame[..], b"hello");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------------------+
//! |                          Application                            |
//! |         Reader::read_frame  <->  Writer::write_frame            |
//! +-----------------------------------------------------------------+
//! |                         Protocol Layer                          |
//! |   Oieb (control header) | Metadata block | Payload ring         |
//! +-----------------------------------------------------------------+
//! |                       Platform Primitives                       |
//! |   Shm (shm_open/mmap) | Sem (sem_open) | Lock (flock advisory)  |
//! +-----------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Reader`] | Owns a ring's resources for their entire lifetime |
//! | [`Writer`] | Connects to an existing ring and writes frames |
//! | [`Frame`] | Zero-copy borrow of one frame's bytes; releases on drop |
//! | [`BufferConfig`] | Ring geometry (metadata and payload capacity) |
//! | [`duplex::DuplexServer`] / [`duplex::DuplexClient`] | Request/response channel built from a pair of rings |
//!
//! ## Modules Overview
//!
//! - [`reader`] / [`writer`] - the core single-direction channel
//! - [`frame`] - the zero-copy frame handle
//! - [`duplex`] - request/response channel built from two rings
//! - [`layout`] - the on-wire control header and frame format
//! - [`platform`] - shared memory, semaphore, and lock primitives
//! - [`config`] - protocol constants
//! - [`error`] - the closed error taxonomy

pub mod config;
pub mod duplex;
pub mod error;
pub mod frame;
pub mod layout;
pub mod platform;
pub mod reader;
pub mod writer;

pub use duplex::{DuplexClient, DuplexServer, RequestHandler};
pub use error::{Error, Result};
pub use frame::Frame;
pub use reader::{Reader, ReaderMetrics};
pub use writer::{Writer, WriterMetrics};

/// Geometry for a ring: how many bytes are set aside for metadata and
/// for the payload ring. Both are rounded up to [`config::ALIGNMENT`]
/// by [`Reader::create`].
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    pub metadata_size: usize,
    pub payload_size: usize,
}
