use super::auction::AllocationEngine;
use super::planner::RequestPlanner;
use super::{AgentView, PeerPolicy, PolicyConfig};
use crate::swarm::{Request, RoundHistory, Upload};

/// The full reciprocity policy: rarest-first planning on the download
/// side, the estimate-driven auction on the upload side. The two halves
/// share nothing but the read-only round snapshot.
#[derive(Debug, Clone)]
pub struct Tyrant {
    planner: RequestPlanner,
    auction: AllocationEngine,
    seed: u64,
}

impl Tyrant {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            planner: RequestPlanner::new(config.max_requests_per_peer, config.seed),
            auction: AllocationEngine::new(config.up_bw, config.seed.wrapping_add(1)),
            seed: config.seed,
        }
    }

    pub fn auction(&self) -> &AllocationEngine {
        &self.auction
    }

    pub fn auction_mut(&mut self) -> &mut AllocationEngine {
        &mut self.auction
    }
}

impl PeerPolicy for Tyrant {
    fn requests(&mut self, view: &AgentView<'_>, _history: &RoundHistory) -> Vec<Request> {
        self.planner.plan(view.agent_id, view.possession, view.peers)
    }

    fn uploads(
        &mut self,
        requests: &[Request],
        view: &AgentView<'_>,
        history: &RoundHistory,
    ) -> Vec<Upload> {
        self.auction.allocate(
            view.agent_id,
            requests,
            view.peers,
            history,
            history.current_round(),
        )
    }

    fn name(&self) -> &str {
        "Tyrant"
    }

    fn reset(&mut self) {
        self.planner.reset(self.seed);
        self.auction.reset(self.seed.wrapping_add(1));
    }

    fn clone_box(&self) -> Box<dyn PeerPolicy> {
        Box::new(self.clone())
    }
}
