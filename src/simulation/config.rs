use crate::agent::BandwidthProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub name: String,
    pub policy_name: String,
    pub num_agents: u32,
    /// Agents that start with every piece.
    pub num_seeds: u32,
    pub num_pieces: usize,
    pub blocks_per_piece: u32,
    pub max_rounds: u64,
    pub max_requests_per_peer: usize,
    /// Chance that a leecher starts out holding any given piece.
    pub initial_piece_fraction: f64,
    pub bandwidth: BandwidthProfile,
    pub seed: u64,
    pub progress: bool,
    pub write_results: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default_sim".to_string(),
            policy_name: "tyrant".to_string(),
            num_agents: 16,
            num_seeds: 1,
            num_pieces: 64,
            blocks_per_piece: 4,
            max_rounds: 200,
            max_requests_per_peer: 8,
            initial_piece_fraction: 0.1,
            bandwidth: BandwidthProfile::Uniform { bw: 32.0 },
            seed: 42,
            progress: true,
            write_results: true,
        }
    }
}

impl SimConfig {
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy_name = policy.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: BandwidthProfile) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Quiet variant for tests and batch comparisons: no progress bar, no
    /// result files.
    pub fn headless(mut self) -> Self {
        self.progress = false;
        self.write_results = false;
        self
    }
}
