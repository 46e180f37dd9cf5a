//! Engine operation counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing index activity.
///
/// Reads count storage fetches that materialized a node; hits on the
/// resident root or the node cache do not move the counter. Writes count
/// storage puts, so writes to the resident root surface only when
/// `flush()` pushes it down. Node and data counts are maintained by the
/// concrete index flavor as it creates and destroys nodes and entries.
#[derive(Debug, Default)]
pub struct Statistics {
    reads: AtomicU64,
    writes: AtomicU64,
    nodes: AtomicU64,
    data: AtomicU64,
}

impl Statistics {
    pub fn new() -> Statistics {
        Statistics::default()
    }

    /// Number of node fetches served by storage.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of node writes reaching storage.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of nodes currently in the index.
    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Number of data entries currently in the index.
    pub fn data(&self) -> u64 {
        self.data.load(Ordering::Relaxed)
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_nodes(&self, count: u64) {
        self.nodes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn remove_nodes(&self, count: u64) {
        self.nodes.fetch_sub(count, Ordering::Relaxed);
    }

    pub fn add_data(&self, count: u64) {
        self.data.fetch_add(count, Ordering::Relaxed);
    }

    pub fn remove_data(&self, count: u64) {
        self.data.fetch_sub(count, Ordering::Relaxed);
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.nodes.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            reads: self.reads(),
            writes: self.writes(),
            nodes: self.nodes(),
            data: self.data(),
        }
    }
}

/// Point-in-time copy of [`Statistics`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatisticsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub nodes: u64,
    pub data: u64,
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reads: {} Writes: {} Nodes: {} Data: {}",
            self.reads, self.writes, self.nodes, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = Statistics::new();
        assert_eq!(stats.snapshot(), StatisticsSnapshot::default());
    }

    #[test]
    fn test_record_and_reset() {
        let stats = Statistics::new();
        stats.record_read();
        stats.record_read();
        stats.record_write();
        stats.add_nodes(3);
        stats.remove_nodes(1);
        stats.add_data(10);
        stats.remove_data(4);

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 2);
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.nodes, 2);
        assert_eq!(snap.data, 6);

        stats.reset();
        assert_eq!(stats.snapshot(), StatisticsSnapshot::default());
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = Arc::new(Statistics::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    stats.record_read();
                    stats.add_data(1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.reads(), 4000);
        assert_eq!(stats.data(), 4000);
    }

    #[test]
    fn test_display() {
        let stats = Statistics::new();
        stats.record_write();
        assert_eq!(
            stats.snapshot().to_string(),
            "Reads: 0 Writes: 1 Nodes: 0 Data: 0"
        );
    }
}
