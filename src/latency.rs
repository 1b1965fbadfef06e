use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

const WINDOW_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub count: usize,
}

/// Rolling record of render pass durations.
pub struct LatencyTracker {
    passes: VecDeque<u64>,
    failures: u64,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            passes: VecDeque::with_capacity(WINDOW_SIZE),
            failures: 0,
        }
    }

    pub fn reset(&mut self) {
        self.passes.clear();
        self.failures = 0;
    }

    pub fn start(&self) -> Instant {
        Instant::now()
    }

    pub fn record_pass(&mut self, start: Instant) {
        self.record(start.elapsed());
    }

    pub fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if self.passes.len() >= WINDOW_SIZE {
            self.passes.pop_front();
        }
        self.passes.push_back(us);
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn stats(&self) -> LatencyStats {
        compute_stats(&self.passes)
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_stats(q: &VecDeque<u64>) -> LatencyStats {
    if q.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted: Vec<u64> = q.iter().copied().collect();
    sorted.sort_unstable();
    let n = sorted.len();
    LatencyStats {
        p50_us: sorted[n * 50 / 100],
        p95_us: sorted[n * 95 / 100],
        p99_us: sorted[(n * 99 / 100).min(n - 1)],
        min_us: sorted[0],
        max_us: sorted[n - 1],
        count: n,
    }
}
