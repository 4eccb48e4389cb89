// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Duplex core: a pair of rings, `{name}_request` and `{name}_response`,
//! composed into a request/response channel correlated by ZeroBuffer
//! sequence numbers.

use crate::config::{DUPLEX_CONNECT_RETRY_BUDGET, DUPLEX_CONNECT_RETRY_INTERVAL, DUPLEX_SERVER_POLL_TIMEOUT};
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::writer::Writer;
use crate::BufferConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Handler trait for processing duplex requests.
///
/// Implement this trait to define a service's logic, or supply a
/// closure matching its blanket implementation below.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle one request and return the response payload to write
    /// back, or an error message to log (no response is sent for that
    /// sequence in that case).
    fn handle(&self, sequence_number: u64, payload: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

impl<F> RequestHandler for F
where
    F: Fn(u64, &[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync + 'static,
{
    fn handle(&self, sequence_number: u64, payload: &[u8]) -> std::result::Result<Vec<u8>, String> {
        self(sequence_number, payload)
    }
}

fn request_ring_name(channel_name: &str) -> String {
    format!("{channel_name}_request")
}

fn response_ring_name(channel_name: &str) -> String {
    format!("{channel_name}_response")
}

/// The server side of a duplex channel: owns the request ring and
/// drives a single dedicated thread that reads requests, invokes the
/// handler, and writes responses.
pub struct DuplexServer {
    channel_name: String,
    shutdown: Arc<AtomicBool>,
    requests_processed: Arc<AtomicU64>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl DuplexServer {
    /// Create the request ring and spawn the server loop. The loop
    /// connects to the client's response ring lazily, retrying for up
    /// to [`DUPLEX_CONNECT_RETRY_BUDGET`] before giving up.
    pub fn start<H: RequestHandler>(channel_name: &str, config: BufferConfig, handler: H) -> Result<Self> {
        let request_reader = Reader::create(&request_ring_name(channel_name), config)?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let requests_processed = Arc::new(AtomicU64::new(0));
        let handler: Arc<dyn RequestHandler> = Arc::new(handler);

        let worker_shutdown = shutdown.clone();
        let worker_processed = requests_processed.clone();
        let response_name = response_ring_name(channel_name);
        let channel = channel_name.to_string();

        let worker = std::thread::spawn(move || {
            server_loop(request_reader, &response_name, &channel, handler, worker_shutdown, worker_processed);
        });

        log::info!("duplex server '{channel_name}' started");

        Ok(Self { channel_name: channel_name.to_string(), shutdown, requests_processed, worker: Some(worker) })
    }

    /// Signal the server loop to stop and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        log::info!("duplex server '{}' stopped", self.channel_name);
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    pub fn requests_processed(&self) -> u64 {
        self.requests_processed.load(Ordering::Relaxed)
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }
}

impl Drop for DuplexServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn server_loop(
    mut request_reader: Reader,
    response_name: &str,
    channel_name: &str,
    handler: Arc<dyn RequestHandler>,
    shutdown: Arc<AtomicBool>,
    requests_processed: Arc<AtomicU64>,
) {
    let mut response_writer: Option<Writer> = None;

    while !shutdown.load(Ordering::Relaxed) {
        match request_reader.read_frame(DUPLEX_SERVER_POLL_TIMEOUT) {
            Ok(Some(frame)) => {
                let sequence_number = frame.sequence_number();
                let request_bytes = frame.data().to_vec();
                drop(frame);

                let writer = match &mut response_writer {
                    Some(w) => w,
                    None => match connect_response_writer(response_name, channel_name, &shutdown) {
                        Some(w) => response_writer.insert(w),
                        None => return,
                    },
                };

                match handler.handle(sequence_number, &request_bytes) {
                    Ok(response) => {
                        if let Err(e) = writer.write_frame(&response) {
                            log::error!("duplex server '{channel_name}' failed to write response: {e}");
                        } else {
                            requests_processed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(msg) => {
                        log::warn!("duplex server '{channel_name}' handler error on seq {sequence_number}: {msg}");
                    }
                }
            }
            Ok(None) => continue,
            Err(Error::WriterDead) => {
                log::info!("duplex server '{channel_name}' client disconnected");
                break;
            }
            Err(e) => {
                log::error!("duplex server '{channel_name}' fatal read error: {e}");
                break;
            }
        }
    }
}

/// Connect to the client's response ring, retrying for up to
/// [`DUPLEX_CONNECT_RETRY_BUDGET`]. Polls `shutdown` between retries so a
/// shutdown request during this (rare, first-request-only) wait is still
/// honored promptly. Returns `None` if the budget expires or shutdown is
/// requested first.
fn connect_response_writer(response_name: &str, channel_name: &str, shutdown: &Arc<AtomicBool>) -> Option<Writer> {
    let deadline = Instant::now() + DUPLEX_CONNECT_RETRY_BUDGET;
    loop {
        match Writer::connect(response_name) {
            Ok(w) => return Some(w),
            Err(_) if shutdown.load(Ordering::Relaxed) => return None,
            Err(_) if Instant::now() < deadline => {
                std::thread::sleep(DUPLEX_CONNECT_RETRY_INTERVAL);
            }
            Err(e) => {
                log::error!("duplex server '{channel_name}' could not connect to response ring: {e}");
                return None;
            }
        }
    }
}

/// The client side of a duplex channel: connects to the server's
/// request ring and creates its own response ring.
pub struct DuplexClient {
    request_writer: Writer,
    response_reader: Reader,
}

impl DuplexClient {
    /// Connect to a running server's request ring and create the
    /// response ring it will write back to.
    pub fn connect(channel_name: &str, response_config: BufferConfig) -> Result<Self> {
        let request_writer = Writer::connect(&request_ring_name(channel_name))?;
        let response_reader = Reader::create(&response_ring_name(channel_name), response_config)?;
        Ok(Self { request_writer, response_reader })
    }

    /// Send `payload` as a request and block up to `timeout` for the
    /// correlated response. Returns `Ok(None)` on timeout.
    pub fn call(&mut self, payload: &[u8], timeout: Duration) -> Result<Option<Vec<u8>>> {
        let (sequence_number, dest) = self.request_writer.get_frame_buffer(payload.len())?;
        dest.copy_from_slice(payload);
        self.request_writer.commit_frame(payload.len());

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.response_reader.read_frame(remaining)? {
                Some(frame) if frame.sequence_number() == sequence_number => {
                    return Ok(Some(frame.data().to_vec()));
                }
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name() -> String {
        format!("zb_test_duplex_{}_{}", std::process::id(), fastrand::u64(..))
    }

    #[test]
    fn echo_round_trip() {
        let channel = unique_name();
        let config = BufferConfig { metadata_size: 64, payload_size: 4096 };

        let mut server =
            DuplexServer::start(&channel, config, |_seq, payload: &[u8]| Ok(payload.to_vec())).unwrap();

        let mut client = DuplexClient::connect(&channel, config).unwrap();
        let response = client.call(b"hello", Duration::from_secs(2)).unwrap();
        assert_eq!(response, Some(b"hello".to_vec()));

        server.shutdown();
    }
}
