use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::Lane;

/// Counters for one lane
#[derive(Debug, Default)]
pub struct LaneCounters {
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    requeued: AtomicU64,
    busy_micros: AtomicU64,
}

/// Point-in-time copy of a lane's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneSnapshot {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub requeued: u64,
    pub busy: Duration,
}

impl LaneSnapshot {
    /// Jobs that finished, successfully or not
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }

    /// Calculate success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total_processed = self.processed();
        if total_processed == 0 {
            100.0
        } else {
            (self.completed as f64 / total_processed as f64) * 100.0
        }
    }
}

/// Live metrics for both lanes
#[derive(Debug, Default)]
pub struct LaneMetrics {
    small: LaneCounters,
    large: LaneCounters,
}

impl LaneMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, lane: Lane) -> &LaneCounters {
        match lane {
            Lane::Small => &self.small,
            Lane::Large => &self.large,
        }
    }

    pub fn increment_dispatched(&self, lane: Lane) {
        self.counters(lane).dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_completed(&self, lane: Lane, elapsed: Duration) {
        let counters = self.counters(lane);
        counters.completed.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let _ = counters
            .busy_micros
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |busy| Some(busy.saturating_add(micros)));
    }

    pub fn increment_failed(&self, lane: Lane) {
        self.counters(lane).failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requeued(&self, lane: Lane) {
        self.counters(lane).requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, lane: Lane) -> LaneSnapshot {
        let counters = self.counters(lane);
        LaneSnapshot {
            dispatched: counters.dispatched.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            requeued: counters.requeued.load(Ordering::Relaxed),
            busy: Duration::from_micros(counters.busy_micros.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_are_counted_separately() {
        let metrics = LaneMetrics::new();
        metrics.increment_dispatched(Lane::Small);
        metrics.increment_dispatched(Lane::Small);
        metrics.increment_completed(Lane::Small, Duration::from_millis(3));
        metrics.increment_failed(Lane::Large);

        let small = metrics.snapshot(Lane::Small);
        assert_eq!(small.dispatched, 2);
        assert_eq!(small.completed, 1);
        assert_eq!(small.busy, Duration::from_millis(3));
        assert_eq!(small.success_rate(), 100.0);

        let large = metrics.snapshot(Lane::Large);
        assert_eq!(large.dispatched, 0);
        assert_eq!(large.failed, 1);
        assert_eq!(large.success_rate(), 0.0);
    }

    #[test]
    fn busy_time_saturates() {
        let metrics = LaneMetrics::new();
        metrics.increment_completed(Lane::Large, Duration::MAX);
        metrics.increment_completed(Lane::Large, Duration::from_secs(1));

        let large = metrics.snapshot(Lane::Large);
        assert_eq!(large.completed, 2);
        assert_eq!(large.busy, Duration::from_micros(u64::MAX));
    }
}
