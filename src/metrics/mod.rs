pub mod analyzer;
pub mod logger;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub round: u64,
    pub blocks_moved: u64,
    pub total_blocks: u64,
    pub bandwidth_offered: f64,
    pub utilization: f64,
    pub completed_agents: u32,
    pub avg_completion: f64,
}

/// Shared handle over the per-run counters. The driver is single-threaded,
/// but `compare` runs whole simulations on rayon workers, so the handle
/// stays cheap to clone and safe to read from anywhere.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    num_agents: u32,
    total_capacity: f64,
    total_blocks: u64,
    round_blocks: u64,
    round_bandwidth: f64,
    completed_agents: u32,
    avg_completion: f64,
    snapshots: Vec<MetricsSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
        }
    }

    /// Swarm shape, recorded once at setup so utilization has a
    /// denominator.
    pub fn set_population(&self, num_agents: u32, total_capacity: f64) {
        let mut inner = self.inner.write();
        inner.num_agents = num_agents;
        inner.total_capacity = total_capacity;
    }

    pub fn blocks_moved(&self, blocks: u64) {
        let mut inner = self.inner.write();
        inner.round_blocks += blocks;
        inner.total_blocks += blocks;
    }

    pub fn bandwidth_offered(&self, bandwidth: f64) {
        self.inner.write().round_bandwidth += bandwidth;
    }

    pub fn set_completion(&self, completed_agents: u32, avg_completion: f64) {
        let mut inner = self.inner.write();
        inner.completed_agents = completed_agents;
        inner.avg_completion = avg_completion;
    }

    pub fn snapshot(&self, round: u64) -> MetricsSnapshot {
        let inner = self.inner.read();
        let utilization = if inner.total_capacity > 0.0 {
            inner.round_bandwidth / inner.total_capacity
        } else {
            0.0
        };
        MetricsSnapshot {
            round,
            blocks_moved: inner.round_blocks,
            total_blocks: inner.total_blocks,
            bandwidth_offered: inner.round_bandwidth,
            utilization,
            completed_agents: inner.completed_agents,
            avg_completion: inner.avg_completion,
        }
    }

    /// Close out the round: store a snapshot and zero the round counters.
    pub fn save_snapshot(&self, round: u64) {
        let snapshot = self.snapshot(round);
        let mut inner = self.inner.write();
        inner.snapshots.push(snapshot);
        inner.round_blocks = 0;
        inner.round_bandwidth = 0.0;
    }

    pub fn get_snapshots(&self) -> Vec<MetricsSnapshot> {
        self.inner.read().snapshots.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
