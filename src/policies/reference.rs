use super::planner::RequestPlanner;
use super::{even_split, AgentView, PeerPolicy, PolicyConfig};
use crate::swarm::{AgentId, Request, RoundHistory, Upload};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const UNCHOKE_SLOTS: usize = 4;
const OPTIMISTIC_INTERVAL: u64 = 3;
/// Rounds of history the reciprocation ranking looks back over.
const RATE_WINDOW: u64 = 2;

/// The classic reference client: rarest-first requests, upload slots for
/// the best recent reciprocators, and one optimistic slot re-rolled every
/// few rounds to discover better trading partners. Bandwidth is split
/// evenly across whoever holds a slot.
#[derive(Debug, Clone)]
pub struct Reference {
    planner: RequestPlanner,
    up_bw: f64,
    optimistic: Option<AgentId>,
    seed: u64,
    rng: StdRng,
}

impl Reference {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            planner: RequestPlanner::new(config.max_requests_per_peer, config.seed),
            up_bw: config.up_bw,
            optimistic: None,
            seed: config.seed,
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
        }
    }
}

impl PeerPolicy for Reference {
    fn requests(&mut self, view: &AgentView<'_>, _history: &RoundHistory) -> Vec<Request> {
        self.planner.plan(view.agent_id, view.possession, view.peers)
    }

    fn uploads(
        &mut self,
        requests: &[Request],
        view: &AgentView<'_>,
        history: &RoundHistory,
    ) -> Vec<Upload> {
        if requests.is_empty() {
            return Vec::new();
        }
        let round = history.current_round();

        let mut seen = HashSet::new();
        let mut requesters: Vec<AgentId> = Vec::new();
        for req in requests {
            if seen.insert(req.requester_id) {
                requesters.push(req.requester_id);
            }
        }

        // Blocks each requester sent us over the last couple of rounds.
        let mut received: HashMap<AgentId, u32> = HashMap::new();
        for back in 1..=RATE_WINDOW {
            if back > round {
                break;
            }
            for (from, blocks) in history.blocks_to(view.agent_id, round - back) {
                *received.entry(from).or_insert(0) += blocks;
            }
        }

        // Shuffle before the stable sort: at round 0 (or between peers
        // with identical records) the ranking is a fair coin flip.
        requesters.shuffle(&mut self.rng);
        requesters.sort_by_key(|id| std::cmp::Reverse(received.get(id).copied().unwrap_or(0)));

        let regular_slots = UNCHOKE_SLOTS - 1;
        let mut chosen: Vec<AgentId> = requesters.iter().copied().take(regular_slots).collect();

        // Optimistic slot: re-rolled on a fixed cadence, otherwise sticky
        // so a discovered partner gets a fair trial period.
        let needs_reroll = round % OPTIMISTIC_INTERVAL == 0
            || self
                .optimistic
                .map_or(true, |id| !requesters.contains(&id));
        if needs_reroll {
            let outside: Vec<AgentId> = requesters
                .iter()
                .copied()
                .filter(|id| !chosen.contains(id))
                .collect();
            self.optimistic = outside.choose(&mut self.rng).copied();
        }
        if let Some(id) = self.optimistic {
            if !chosen.contains(&id) {
                chosen.push(id);
            }
        }

        debug!(
            "agent {}: unchoking {} of {} requesters",
            view.agent_id,
            chosen.len(),
            requesters.len()
        );

        let shares = even_split(self.up_bw, chosen.len());
        chosen
            .into_iter()
            .zip(shares)
            .map(|(peer, bw)| Upload::new(view.agent_id, peer, bw))
            .collect()
    }

    fn name(&self) -> &str {
        "Reference"
    }

    fn reset(&mut self) {
        self.planner.reset(self.seed);
        self.optimistic = None;
        self.rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
    }

    fn clone_box(&self) -> Box<dyn PeerPolicy> {
        Box::new(self.clone())
    }
}
