//! Shared fixture helpers for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;

/// Directory holding the fixture packets
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Path of a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Check whether a fixture file is present
pub fn fixture_exists(name: &str) -> bool {
    fixture_path(name).exists()
}

/// Read a fixture file
pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).unwrap_or_else(|e| panic!("reading {}: {}", name, e))
}

/// Route log output to the test harness
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::max())
        .try_init();
}
