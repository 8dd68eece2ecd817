//! Inclusive/exclusive statistics attached to functions, lines and tree nodes

use serde::Serialize;
use std::ops::AddAssign;

use crate::domain::Metric;

/// Sample, time and memory totals of one function, line or call-tree node
///
/// Exclusive values count what happened while the owner was on top of the
/// stack; inclusive values count everything that happened while it was
/// anywhere on the stack. Inclusive is never less than exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub samples_inclusive: u64,
    pub samples_exclusive: u64,
    pub time_inclusive: u64,
    pub time_exclusive: u64,
    pub memory_inclusive: u64,
    pub memory_exclusive: u64,
}

impl Statistics {
    #[must_use]
    pub fn value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::SamplesInclusive => self.samples_inclusive,
            Metric::SamplesExclusive => self.samples_exclusive,
            Metric::TimeInclusive => self.time_inclusive,
            Metric::TimeExclusive => self.time_exclusive,
            Metric::MemoryInclusive => self.memory_inclusive,
            Metric::MemoryExclusive => self.memory_exclusive,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn add_samples_inclusive(&mut self, count: u64, time: u64) {
        self.samples_inclusive = self.samples_inclusive.saturating_add(count);
        self.time_inclusive = self.time_inclusive.saturating_add(time);
    }

    pub fn add_samples_exclusive(&mut self, count: u64, time: u64) {
        self.samples_exclusive = self.samples_exclusive.saturating_add(count);
        self.time_exclusive = self.time_exclusive.saturating_add(time);
    }

    pub fn add_memory_inclusive(&mut self, size: u64) {
        self.memory_inclusive = self.memory_inclusive.saturating_add(size);
    }

    pub fn add_memory_exclusive(&mut self, size: u64) {
        self.memory_exclusive = self.memory_exclusive.saturating_add(size);
    }
}

impl AddAssign for Statistics {
    fn add_assign(&mut self, other: Self) {
        self.add_samples_inclusive(other.samples_inclusive, other.time_inclusive);
        self.add_samples_exclusive(other.samples_exclusive, other.time_exclusive);
        self.add_memory_inclusive(other.memory_inclusive);
        self.add_memory_exclusive(other.memory_exclusive);
    }
}

/// Weight that could not be attributed to any function
///
/// Samples with an empty stack and allocations recorded while the stack was
/// empty land here instead of in the call tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Unattributed {
    pub samples: u64,
    pub time: u64,
    pub memory: u64,
}

impl AddAssign for Unattributed {
    fn add_assign(&mut self, other: Self) {
        self.samples = self.samples.saturating_add(other.samples);
        self.time = self.time.saturating_add(other.time);
        self.memory = self.memory.saturating_add(other.memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_by_metric() {
        let mut stats = Statistics::default();
        stats.add_samples_inclusive(3, 30);
        stats.add_samples_exclusive(1, 10);
        stats.add_memory_inclusive(64);

        assert_eq!(stats.value(Metric::SamplesInclusive), 3);
        assert_eq!(stats.value(Metric::TimeExclusive), 10);
        assert_eq!(stats.value(Metric::MemoryInclusive), 64);
        assert_eq!(stats.value(Metric::MemoryExclusive), 0);
    }

    #[test]
    fn test_add_assign_sums_every_field() {
        let mut a = Statistics::default();
        a.add_samples_exclusive(1, 10);
        let mut b = Statistics::default();
        b.add_samples_exclusive(2, 20);
        b.add_memory_exclusive(8);

        a += b;
        assert_eq!(a.samples_exclusive, 3);
        assert_eq!(a.time_exclusive, 30);
        assert_eq!(a.memory_exclusive, 8);
        assert!(!a.is_zero());
        assert!(Statistics::default().is_zero());
    }
}
