//! CPU utilization history
//!
//! CPU records carry cumulative CPU time in microseconds. Each record is
//! compared with the one before it; the resulting utilization point covers
//! the interval between the two.

// Utilization is a ratio of u64 counters
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuPoint {
    /// Milliseconds since the profiler time reference
    pub timestamp: u64,
    /// Percentage of the available cores, in [0, 100]
    pub utilization: f64,
    /// Profiling was paused after this point
    pub paused: bool,
    /// First point after profiling resumed
    pub resumed: bool,
}

/// Utilization series of one thread or of the whole process
#[derive(Debug, Clone)]
pub struct CpuHistory {
    core_count: u32,
    overflow_threshold: u64,
    previous: Option<(u64, u64)>,
    just_resumed: bool,
    points: Vec<CpuPoint>,
}

impl CpuHistory {
    #[must_use]
    pub fn new(core_count: u32, overflow_threshold: u64) -> Self {
        Self {
            core_count: core_count.max(1),
            overflow_threshold,
            previous: None,
            just_resumed: false,
            points: Vec::new(),
        }
    }

    /// Feed one cumulative CPU time reading
    ///
    /// Returns the new point, or `None` when the reading yields no point:
    /// first reading, non-positive interval, counter wraparound, or a CPU
    /// time that went backwards outside of a resume.
    pub fn record(&mut self, timestamp: u64, cumulative_us: u64) -> Option<&CpuPoint> {
        let previous = self.previous.replace((timestamp, cumulative_us));
        let resumed = std::mem::take(&mut self.just_resumed);
        let (previous_timestamp, previous_cpu) = previous?;

        if timestamp <= previous_timestamp {
            return None;
        }
        let elapsed_ms = timestamp - previous_timestamp;
        let delta = i128::from(cumulative_us) - i128::from(previous_cpu);
        if delta >= i128::from(self.overflow_threshold) {
            return None;
        }

        let utilization = if delta < 0 {
            if !resumed {
                return None;
            }
            0.0
        } else {
            let busy = delta as f64 / (elapsed_ms as f64 * 1000.0) * 100.0;
            (busy / f64::from(self.core_count)).clamp(0.0, 100.0)
        };

        self.points.push(CpuPoint { timestamp, utilization, paused: false, resumed });
        self.points.last()
    }

    /// Flag the last emitted point as the one before a pause
    pub fn mark_paused(&mut self) {
        if let Some(last) = self.points.last_mut() {
            last.paused = true;
        }
    }

    /// Accept the next reading even if CPU time went backwards
    pub fn mark_resumed(&mut self) {
        self.just_resumed = true;
    }

    #[must_use]
    pub fn points(&self) -> &[CpuPoint] {
        &self.points
    }

    /// Average utilization of the points inside `[start, end]`
    #[must_use]
    pub fn average(&self, start: u64, end: u64) -> Option<f64> {
        let (sum, count) = self
            .points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .fold((0.0, 0usize), |(sum, count), p| (sum + p.utilization, count + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: u64 = 0xFFFF_FFFF;

    #[test]
    fn test_first_record_yields_no_point() {
        let mut history = CpuHistory::new(1, THRESHOLD);
        assert!(history.record(100, 5_000).is_none());
        assert!(history.points().is_empty());
    }

    #[test]
    fn test_utilization_formula() {
        let mut history = CpuHistory::new(2, THRESHOLD);
        history.record(0, 0);
        // 50ms of CPU over 100ms on 2 cores
        let point = history.record(100, 50_000).unwrap();
        assert!((point.utilization - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_utilization_is_clamped() {
        let mut history = CpuHistory::new(1, THRESHOLD);
        history.record(0, 0);
        let point = history.record(10, 1_000_000).unwrap();
        assert!((point.utilization - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_positive_interval_yields_no_point() {
        let mut history = CpuHistory::new(1, THRESHOLD);
        history.record(100, 0);
        assert!(history.record(100, 10).is_none());
        assert!(history.record(50, 20).is_none());
    }

    #[test]
    fn test_overflow_delta_yields_no_point() {
        let mut history = CpuHistory::new(1, 1_000);
        history.record(0, 0);
        assert!(history.record(100, 1_000).is_none());
        assert!(history.record(200, 1_500).is_some());
    }

    #[test]
    fn test_negative_delta_only_bridged_after_resume() {
        let mut history = CpuHistory::new(1, THRESHOLD);
        history.record(0, 10_000);
        assert!(history.record(100, 5_000).is_none());

        history.mark_paused();
        history.mark_resumed();
        let point = *history.record(200, 1_000).unwrap();
        assert!(point.resumed);
        assert!(point.utilization.abs() < f64::EPSILON);

        // The flag is consumed by one record
        assert!(history.record(300, 500).is_none());
    }

    #[test]
    fn test_resume_flag_resets_even_without_point() {
        let mut history = CpuHistory::new(1, THRESHOLD);
        history.mark_resumed();
        assert!(history.record(0, 100).is_none());
        assert!(history.record(100, 50).is_none());
    }

    #[test]
    fn test_pause_flags_last_point() {
        let mut history = CpuHistory::new(1, THRESHOLD);
        history.record(0, 0);
        history.record(100, 10_000);
        history.mark_paused();
        assert!(history.points()[0].paused);
    }
}
