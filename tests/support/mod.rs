// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ZeroBuffer Contributors

//! Shared helpers for integration tests.

pub fn init_logging() {
    let _ = env_logger::try_init();
}

pub fn unique_name(label: &str) -> String {
    format!("zb_it_{}_{}_{}", label, std::process::id(), fastrand::u64(..))
}
