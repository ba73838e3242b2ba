//! Arbor Metrics - lifecycle counters and sweep timing
//!
//! Instrumentation used by the hierarchy core to count state transitions and
//! captured unit failures, and to time whole-subtree lifecycle sweeps.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use arbor_metrics::{Counter, SweepProfiler};
//!
//! let mut counter = Counter::new();
//! counter.increment("transitions.attach", 1);
//!
//! let mut profiler = SweepProfiler::new();
//! let timer = profiler.begin();
//! // ... run a sweep ...
//! profiler.end("attach", timer);
//! ```
//!
//! Without the `metrics` feature every type here is a zero-sized stub and
//! all calls compile away.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod sweep_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use sweep_profiler::{SweepProfiler, SweepTimer};

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: usize) {}
    pub fn get(&self, _name: &str) -> usize { 0 }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy)]
pub struct SweepTimer;

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct SweepProfiler;

#[cfg(not(feature = "metrics"))]
impl SweepProfiler {
    pub fn new() -> Self { Self }
    pub fn begin(&self) -> SweepTimer { SweepTimer }
    pub fn end(&mut self, _name: &'static str, _timer: SweepTimer) {}
    pub fn get_timing(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn sweep_count(&self, _name: &str) -> u64 { 0 }
}
