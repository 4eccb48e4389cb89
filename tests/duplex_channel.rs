// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Duplex request/response scenarios built on a pair of rings.

use std::time::Duration;
use zerobuffer::duplex::{DuplexClient, DuplexServer};
use zerobuffer::BufferConfig;

mod support;
use support::{init_logging, unique_name};

fn config() -> BufferConfig {
    BufferConfig { metadata_size: 64, payload_size: 8192 }
}

#[test]
fn echoes_request_back_unchanged() {
    init_logging();
    let channel = unique_name("echo");
    let mut server = DuplexServer::start(&channel, config(), |_seq, payload: &[u8]| Ok(payload.to_vec())).unwrap();
    let mut client = DuplexClient::connect(&channel, config()).unwrap();

    let response = client.call(b"ping", Duration::from_secs(2)).unwrap();
    assert_eq!(response, Some(b"ping".to_vec()));
    assert_eq!(server.requests_processed(), 1);

    server.shutdown();
}

#[test]
fn handler_can_transform_the_request() {
    init_logging();
    let channel = unique_name("uppercase");
    let mut server = DuplexServer::start(&channel, config(), |_seq, payload: &[u8]| {
        Ok(payload.iter().map(u8::to_ascii_uppercase).collect())
    })
    .unwrap();
    let mut client = DuplexClient::connect(&channel, config()).unwrap();

    let response = client.call(b"hello", Duration::from_secs(2)).unwrap();
    assert_eq!(response, Some(b"HELLO".to_vec()));

    server.shutdown();
}

#[test]
fn multiple_sequential_calls_stay_correlated() {
    init_logging();
    let channel = unique_name("sequential");
    let mut server = DuplexServer::start(&channel, config(), |seq: u64, _payload: &[u8]| Ok(seq.to_le_bytes().to_vec()))
        .unwrap();
    let mut client = DuplexClient::connect(&channel, config()).unwrap();

    for expected_seq in 1..=5u64 {
        let response = client.call(b"x", Duration::from_secs(2)).unwrap().unwrap();
        assert_eq!(u64::from_le_bytes(response.try_into().unwrap()), expected_seq);
    }

    server.shutdown();
}

#[test]
fn shutdown_stops_the_server_thread() {
    init_logging();
    let channel = unique_name("shutdown");
    let mut server = DuplexServer::start(&channel, config(), |_seq, payload: &[u8]| Ok(payload.to_vec())).unwrap();
    assert!(server.is_running());
    server.shutdown();
    assert!(!server.is_running());
}
