//! Heap snapshots taken after garbage collections

use std::collections::BTreeMap;

use serde::Serialize;

use coreprof_common::{ClassId, GcItem};

#[derive(Debug, Clone, Serialize)]
pub struct GcSnapshot {
    /// Milliseconds since the profiler time reference
    pub timestamp: u64,
    pub items: Vec<GcItem>,
}

impl GcSnapshot {
    /// Live heap size across all classes
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.items.iter().fold(0u64, |total, item| total.saturating_add(item.size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GcPoint {
    pub timestamp: u64,
    pub count: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct GcHistory {
    snapshots: Vec<GcSnapshot>,
    by_class: BTreeMap<ClassId, Vec<GcPoint>>,
}

impl GcHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timestamp: u64, items: &[GcItem]) {
        for item in items {
            self.by_class.entry(item.class_id).or_default().push(GcPoint {
                timestamp,
                count: item.count,
                size: item.size,
            });
        }
        self.snapshots.push(GcSnapshot { timestamp, items: items.to_vec() });
    }

    #[must_use]
    pub fn snapshots(&self) -> &[GcSnapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn series(&self, class_id: ClassId) -> &[GcPoint] {
        self.by_class.get(&class_id).map_or(&[], Vec::as_slice)
    }

    /// Most recent snapshot taken at or before `timestamp`
    #[must_use]
    pub fn latest_at(&self, timestamp: u64) -> Option<&GcSnapshot> {
        self.snapshots.iter().rev().find(|s| s.timestamp <= timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(class: u64, count: u64, size: u64) -> GcItem {
        GcItem { class_id: ClassId(class), count, size }
    }

    #[test]
    fn test_snapshot_and_class_series() {
        let mut history = GcHistory::new();
        history.record(100, &[item(1, 2, 64), item(2, 1, 24)]);
        history.record(200, &[item(1, 1, 32)]);

        assert_eq!(history.snapshots().len(), 2);
        assert_eq!(history.snapshots()[0].total_size(), 88);
        assert_eq!(history.series(ClassId(1)).len(), 2);
        assert_eq!(history.series(ClassId(2)), &[GcPoint { timestamp: 100, count: 1, size: 24 }]);
    }

    #[test]
    fn test_latest_at() {
        let mut history = GcHistory::new();
        history.record(100, &[]);
        history.record(200, &[]);

        assert!(history.latest_at(50).is_none());
        assert_eq!(history.latest_at(150).map(|s| s.timestamp), Some(100));
        assert_eq!(history.latest_at(200).map(|s| s.timestamp), Some(200));
    }
}
