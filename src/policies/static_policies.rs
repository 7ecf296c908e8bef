// A catch-all for the two trivial baselines, they mostly exist so the
// smarter policies have something to beat in `compare`.

use super::planner::RequestPlanner;
use super::{even_split, AgentView, PeerPolicy, PolicyConfig};
use crate::swarm::{AgentId, Request, RoundHistory, Upload};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Hands the whole budget to one uniformly-random requester each round.
#[derive(Debug, Clone)]
pub struct RandomUploader {
    planner: RequestPlanner,
    up_bw: f64,
    seed: u64,
    rng: StdRng,
}

impl RandomUploader {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            planner: RequestPlanner::new(config.max_requests_per_peer, config.seed),
            up_bw: config.up_bw,
            seed: config.seed,
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
        }
    }
}

impl PeerPolicy for RandomUploader {
    fn requests(&mut self, view: &AgentView<'_>, _history: &RoundHistory) -> Vec<Request> {
        self.planner.plan(view.agent_id, view.possession, view.peers)
    }

    fn uploads(
        &mut self,
        requests: &[Request],
        view: &AgentView<'_>,
        _history: &RoundHistory,
    ) -> Vec<Upload> {
        let Some(req) = requests.choose(&mut self.rng) else {
            return Vec::new();
        };
        let chosen = vec![req.requester_id];
        let shares = even_split(self.up_bw, chosen.len());
        chosen
            .into_iter()
            .zip(shares)
            .map(|(peer, bw)| Upload::new(view.agent_id, peer, bw))
            .collect()
    }

    fn name(&self) -> &str {
        "Random"
    }

    fn reset(&mut self) {
        self.planner.reset(self.seed);
        self.rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
    }

    fn clone_box(&self) -> Box<dyn PeerPolicy> {
        Box::new(self.clone())
    }
}

/// Splits the budget evenly across every distinct requester, reciprocation
/// be damned.
#[derive(Debug, Clone)]
pub struct EvenSplit {
    planner: RequestPlanner,
    up_bw: f64,
    seed: u64,
}

impl EvenSplit {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            planner: RequestPlanner::new(config.max_requests_per_peer, config.seed),
            up_bw: config.up_bw,
            seed: config.seed,
        }
    }
}

impl PeerPolicy for EvenSplit {
    fn requests(&mut self, view: &AgentView<'_>, _history: &RoundHistory) -> Vec<Request> {
        self.planner.plan(view.agent_id, view.possession, view.peers)
    }

    fn uploads(
        &mut self,
        requests: &[Request],
        view: &AgentView<'_>,
        _history: &RoundHistory,
    ) -> Vec<Upload> {
        let mut seen = HashSet::new();
        let mut requesters: Vec<AgentId> = Vec::new();
        for req in requests {
            if seen.insert(req.requester_id) {
                requesters.push(req.requester_id);
            }
        }
        if requesters.is_empty() {
            return Vec::new();
        }
        let shares = even_split(self.up_bw, requesters.len());
        requesters
            .into_iter()
            .zip(shares)
            .map(|(peer, bw)| Upload::new(view.agent_id, peer, bw))
            .collect()
    }

    fn name(&self) -> &str {
        "EvenSplit"
    }

    fn reset(&mut self) {
        self.planner.reset(self.seed);
    }

    fn clone_box(&self) -> Box<dyn PeerPolicy> {
        Box::new(self.clone())
    }
}
