//! Wall-clock timing for named lifecycle sweeps

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Token returned by [`SweepProfiler::begin`].
#[derive(Debug, Clone, Copy)]
pub struct SweepTimer(Instant);

#[derive(Debug, Default)]
struct SweepStats {
    total: Duration,
    count: u64,
}

/// Accumulates elapsed time and call counts per sweep name.
///
/// Uses a begin/end pair instead of a closure so callers can time code that
/// needs `&mut` access to the structure owning the profiler.
#[derive(Debug, Default)]
pub struct SweepProfiler {
    sweeps: HashMap<&'static str, SweepStats>,
}

impl SweepProfiler {
    pub fn new() -> Self {
        Self {
            sweeps: HashMap::new(),
        }
    }

    pub fn begin(&self) -> SweepTimer {
        SweepTimer(Instant::now())
    }

    pub fn end(&mut self, name: &'static str, timer: SweepTimer) {
        let stats = self.sweeps.entry(name).or_default();
        stats.total += timer.0.elapsed();
        stats.count += 1;
    }

    pub fn get_timing(&self, name: &str) -> Duration {
        self.sweeps
            .get(name)
            .map(|stats| stats.total)
            .unwrap_or(Duration::ZERO)
    }

    pub fn sweep_count(&self, name: &str) -> u64 {
        self.sweeps.get(name).map(|stats| stats.count).unwrap_or(0)
    }
}
