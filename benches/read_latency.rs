// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Read Latency Benchmark
//!
//! Measures `Reader::read_frame` latency against a writer that feeds
//! frames continuously on a background thread, across payload sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use zerobuffer::{BufferConfig, Reader, Writer};

fn unique_name(label: &str) -> String {
    format!("zb_bench_read_{}_{}", label, std::process::id())
}

fn spawn_feeder(name: String, size: usize, stop: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut writer = loop {
            match Writer::connect(&name) {
                Ok(w) => break w,
                Err(_) => std::thread::sleep(Duration::from_millis(5)),
            }
        };
        let payload = vec![0xEFu8; size];
        while !stop.load(Ordering::Relaxed) {
            let _ = writer.write_frame(&payload);
        }
    })
}

fn bench_read_payload_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_latency_by_size");

    for size in [64, 256, 1024, 4096, 16384, 65536] {
        let name = unique_name(&format!("size_{size}"));
        let mut reader = Reader::create(&name, BufferConfig { metadata_size: 1024, payload_size: 16 * 1024 * 1024 })
            .expect("reader create");

        let stop = Arc::new(AtomicBool::new(false));
        let feeder = spawn_feeder(name, size, stop.clone());

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                reader.read_frame(Duration::from_secs(1)).expect("read should succeed");
            });
        });

        stop.store(true, Ordering::Relaxed);
        let _ = feeder.join();
    }

    group.finish();
}

criterion_group!(read_benches, bench_read_payload_sizes);
criterion_main!(read_benches);
