//! Shared fixtures for Strata tests and benchmarks.
//!
//! Provides canonical layouts ([`fixtures`]), a helper for running code on
//! a second thread, temp-file builders for mapped-region tests, and a
//! one-call logger setup.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::io::Write;
use std::thread;

use strata_core::{ByteOrder, Result};
use strata_memory::{Region, Scope};

pub use fixtures::{packet_layout, point_layout, PACKET_BYTES, POINT_BYTES};

/// Install `env_logger` for the test binary. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Run `f` on a freshly spawned thread and return its result.
///
/// Panics in `f` are propagated to the caller.
pub fn on_other_thread<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    thread::scope(|s| match s.spawn(f).join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    })
}

/// A named temp file holding `bytes`, flushed to disk.
pub fn temp_file_with(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Allocate a point in `scope` and store `(x, y)` into it.
pub fn write_point(scope: &mut Scope, x: u32, y: u32) -> Result<Region> {
    let region = scope.allocate(&point_layout())?;
    region.set(0, ByteOrder::BigEndian, x)?;
    region.set(4, ByteOrder::BigEndian, y)?;
    Ok(region)
}
