use crate::policies::{AgentView, PeerPolicy};
use crate::swarm::{AgentId, PeerView, PieceIndex, PossessionVector, Request, RoundHistory, Upload};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Exp, Pareto};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One swarm participant: its piece state, its upload budget, and the
/// policy deciding what it does with both. The driver owns the round
/// ordering; the agent just answers the two per-round questions.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    possession: PossessionVector,
    policy: Box<dyn PeerPolicy>,
    up_bw: f64,
}

/// How per-agent upload capacity is drawn at setup. Real swarms are
/// nowhere near uniform, which is exactly what makes reciprocity
/// interesting to benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BandwidthProfile {
    Uniform { bw: f64 },
    TwoTier { low: f64, high: f64, high_fraction: f64 },
    Exponential { mean: f64 },
    Pareto { scale: f64, shape: f64 },
}

impl BandwidthProfile {
    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            BandwidthProfile::Uniform { bw } => *bw,
            BandwidthProfile::TwoTier { low, high, high_fraction } => {
                if rng.gen_bool(high_fraction.clamp(0.0, 1.0)) {
                    *high
                } else {
                    *low
                }
            }
            BandwidthProfile::Exponential { mean } => {
                let lambda = 1.0 / mean.max(f64::EPSILON);
                Exp::new(lambda).unwrap().sample(rng)
            }
            BandwidthProfile::Pareto { scale, shape } => {
                Pareto::new(scale.max(f64::EPSILON), shape.max(f64::EPSILON))
                    .unwrap()
                    .sample(rng)
            }
        }
    }
}

impl Agent {
    pub fn new(
        id: AgentId,
        num_pieces: usize,
        blocks_per_piece: u32,
        up_bw: f64,
        policy: Box<dyn PeerPolicy>,
    ) -> Self {
        Self {
            id,
            possession: PossessionVector::new(num_pieces, blocks_per_piece),
            policy,
            up_bw,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn up_bw(&self) -> f64 {
        self.up_bw
    }

    pub fn possession(&self) -> &PossessionVector {
        &self.possession
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn is_complete(&self) -> bool {
        self.possession.all_complete()
    }

    pub fn completion(&self) -> f64 {
        self.possession.completion()
    }

    /// Pre-seed a complete piece before round 0.
    pub fn grant_piece(&mut self, piece: PieceIndex) {
        self.possession.mark_complete(piece);
    }

    /// The availability snapshot other agents see this round: complete
    /// pieces only, partial ones stay private.
    pub fn peer_view(&self) -> PeerView {
        PeerView::new(self.id, self.possession.complete_pieces())
    }

    pub fn plan_requests(&mut self, peers: &[PeerView], history: &RoundHistory) -> Vec<Request> {
        let view = AgentView {
            agent_id: self.id,
            possession: &self.possession,
            peers,
        };
        self.policy.requests(&view, history)
    }

    pub fn allocate_uploads(
        &mut self,
        requests: &[Request],
        peers: &[PeerView],
        history: &RoundHistory,
    ) -> Vec<Upload> {
        let view = AgentView {
            agent_id: self.id,
            possession: &self.possession,
            peers,
        };
        self.policy.uploads(requests, &view, history)
    }

    /// Credit delivered blocks, saturating at piece completion. Returns
    /// how many blocks actually landed.
    pub fn receive_blocks(&mut self, piece: PieceIndex, blocks: u32) -> u32 {
        let applied = self.possession.add_blocks(piece, blocks);
        if applied > 0 && self.possession.is_complete(piece) {
            debug!("agent {} completed piece {}", self.id, piece);
        }
        applied
    }
}
