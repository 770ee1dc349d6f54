//! Logging facilities for Prism.
//!
//! Prism uses the `tracing` crate for instrumentation. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! The constants in [`targets`] can be used with `tracing` directives to
//! filter logs by subsystem, e.g. `RUST_LOG=prism::selection=trace`.

use std::time::Instant;

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "prism_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "prism_core::signal";
    /// Owning-thread dispatch target.
    pub const DISPATCH: &str = "prism_core::dispatch";
    /// Collection aggregation target.
    pub const COLLECTION: &str = "prism::collection";
    /// Selection engine target.
    pub const SELECTION: &str = "prism::selection";
}

/// RAII span that records the duration of an operation at debug level.
///
/// # Example
///
/// ```
/// use prism_core::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("materialize_source");
///     // ... timed work ...
/// } // duration logged here
/// ```
pub struct PerfSpan {
    name: &'static str,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Start a performance span for the named operation.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "prism::perf", "perf", operation = name).entered();
        Self {
            name,
            started: Instant::now(),
            _span: span,
        }
    }

    /// Elapsed time since the span was started.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        tracing::debug!(
            target: "prism::perf",
            operation = self.name,
            elapsed_us = elapsed.as_micros() as u64,
            "operation finished"
        );
    }
}
