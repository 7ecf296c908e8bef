use crate::swarm::{AgentId, PeerView, Request, RoundHistory, Upload};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Growth factor applied to a peer's offer after a round without
/// reciprocation: keep bidding more until it unchokes us.
pub const DEFAULT_ALPHA: f64 = 0.2;
/// Decay factor applied once a peer has reciprocated for `DEFAULT_STREAK`
/// consecutive rounds: stop overpaying a peer that returns blocks anyway.
pub const DEFAULT_GAMMA: f64 = 0.1;
/// Consecutive reciprocation rounds required before the decay kicks in.
pub const DEFAULT_STREAK: u32 = 3;
/// Advertised-piece-count to blocks-per-round conversion used before any
/// real transfer has been observed.
pub const RATE_NORMALIZATION: f64 = 4.0;

/// Offers are clamped into [MIN_OFFER, up_bw]. The lower bound guards the
/// rate division; the upper bound keeps a probed offer fundable at all.
const MIN_OFFER: f64 = 1e-3;

/// What we believe about one peer: the bandwidth it takes to buy its
/// reciprocation (u_ij), the download rate it returns (d_ij), and how many
/// rounds in a row it has actually sent us blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeerEstimate {
    pub upload_offer: f64,
    pub download_rate: f64,
    pub reciprocal_rounds: u32,
}

/// Reciprocity auction over the per-round upload budget.
///
/// Estimates live as long as the agent does: created lazily with the
/// bootstrap rule (round 0 and any peer first seen mid-run alike), updated
/// once per round, never dropped. Each round the engine funds requesters
/// greedily by expected return per unit of bandwidth offered, skipping any
/// requester whose full offer no longer fits in the remaining budget.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    up_bw: f64,
    alpha: f64,
    gamma: f64,
    streak: u32,
    estimates: HashMap<AgentId, PeerEstimate>,
    refreshed_round: Option<u64>,
    rng: StdRng,
}

impl AllocationEngine {
    pub fn new(up_bw: f64, seed: u64) -> Self {
        Self {
            up_bw,
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            streak: DEFAULT_STREAK,
            estimates: HashMap::new(),
            refreshed_round: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_streak(mut self, streak: u32) -> Self {
        self.streak = streak;
        self
    }

    pub fn up_bw(&self) -> f64 {
        self.up_bw
    }

    pub fn estimate(&self, peer: AgentId) -> Option<PeerEstimate> {
        self.estimates.get(&peer).copied()
    }

    pub fn known_peers(&self) -> usize {
        self.estimates.len()
    }

    /// Install a prior for a peer, replacing whatever the bootstrap rule
    /// would produce. Offers are clamped the same way round updates are.
    pub fn seed_estimate(&mut self, peer: AgentId, mut estimate: PeerEstimate) {
        estimate.upload_offer = estimate.upload_offer.clamp(MIN_OFFER, self.up_bw.max(MIN_OFFER));
        self.estimates.insert(peer, estimate);
    }

    fn bootstrap(&self, advertised_pieces: usize, peer_count: usize) -> PeerEstimate {
        PeerEstimate {
            upload_offer: (self.up_bw / peer_count.max(1) as f64).max(MIN_OFFER),
            download_rate: advertised_pieces as f64 / RATE_NORMALIZATION,
            reciprocal_rounds: 0,
        }
    }

    /// Fold the previous round's outcomes into the estimates. Runs at most
    /// once per round index, so a second `allocate` call for the same
    /// round can't double-apply the probe or the decay.
    fn refresh(&mut self, self_id: AgentId, peers: &[PeerView], history: &RoundHistory, round: u64) {
        if self.refreshed_round == Some(round) {
            return;
        }
        self.refreshed_round = Some(round);

        let peer_count = peers.len();
        let (up_bw, alpha, gamma, streak) = (self.up_bw, self.alpha, self.gamma, self.streak);
        let received = if round > 0 {
            history.blocks_to(self_id, round - 1)
        } else {
            HashMap::new()
        };

        for peer in peers {
            let fallback_rate = peer.available_pieces.len() as f64 / RATE_NORMALIZATION;
            let est = self.estimates.entry(peer.peer_id).or_insert_with(|| {
                trace!("agent {}: bootstrapping estimate for peer {}", self_id, peer.peer_id);
                PeerEstimate {
                    upload_offer: (up_bw / peer_count.max(1) as f64).max(MIN_OFFER),
                    download_rate: fallback_rate,
                    reciprocal_rounds: 0,
                }
            });

            if round == 0 {
                continue;
            }

            match received.get(&peer.peer_id) {
                Some(&blocks) if blocks > 0 => {
                    // Reciprocated: trust the observed rate, and once the
                    // streak is long enough start paying less.
                    est.reciprocal_rounds += 1;
                    est.download_rate = f64::from(blocks);
                    if est.reciprocal_rounds >= streak {
                        est.upload_offer = (est.upload_offer * (1.0 - gamma)).max(MIN_OFFER);
                    }
                }
                _ => {
                    // Silent: probe with a bigger offer and fall back to
                    // the coarse piece-count rate guess.
                    est.reciprocal_rounds = 0;
                    est.upload_offer =
                        (est.upload_offer * (1.0 + alpha)).clamp(MIN_OFFER, up_bw.max(MIN_OFFER));
                    est.download_rate = fallback_rate;
                }
            }
        }
    }

    /// Decide this round's uploads. `requests` holds only the requests
    /// addressed to this agent; peers without one sit the auction out no
    /// matter how good their estimate looks.
    pub fn allocate(
        &mut self,
        self_id: AgentId,
        requests: &[Request],
        peers: &[PeerView],
        history: &RoundHistory,
        round: u64,
    ) -> Vec<Upload> {
        self.refresh(self_id, peers, history, round);

        if requests.is_empty() {
            debug!("agent {}: no one wants my pieces this round", self_id);
            return Vec::new();
        }

        // Distinct requesters, first-come order.
        let mut seen = HashSet::new();
        let mut candidates: Vec<AgentId> = Vec::new();
        for req in requests {
            if seen.insert(req.requester_id) {
                candidates.push(req.requester_id);
            }
        }

        // A requester we've never met (joined mid-run, not in this round's
        // peer list at refresh time) gets the same bootstrap as round 0.
        let peer_count = peers.len().max(candidates.len());
        for &id in &candidates {
            if !self.estimates.contains_key(&id) {
                let advertised = peers
                    .iter()
                    .find(|p| p.peer_id == id)
                    .map(|p| p.available_pieces.len())
                    .unwrap_or(0);
                let est = self.bootstrap(advertised, peer_count);
                self.estimates.insert(id, est);
            }
        }

        // Value per cost: expected blocks back per unit of bandwidth paid.
        let mut rates: Vec<(AgentId, f64)> = Vec::with_capacity(candidates.len());
        for &id in &candidates {
            let est = self.estimates[&id];
            if est.upload_offer <= 0.0 {
                // Degenerate state shouldn't survive the clamps; skip the
                // peer instead of dividing by it.
                debug!("agent {}: skipping peer {} with invalid offer", self_id, id);
                continue;
            }
            rates.push((id, est.download_rate / est.upload_offer));
        }

        let mut cap = self.up_bw;
        let mut uploads = Vec::new();

        while cap > 0.0 && !rates.is_empty() {
            let best = rates
                .iter()
                .map(|&(_, r)| r)
                .fold(f64::NEG_INFINITY, f64::max);
            let tied: Vec<AgentId> = rates
                .iter()
                .filter(|&&(_, r)| r == best)
                .map(|&(id, _)| id)
                .collect();

            // Uniform pick among exact ties so one peer can't be starved
            // by ordering alone.
            let Some(&winner) = tied.choose(&mut self.rng) else {
                break;
            };

            let offer = self.estimates[&winner].upload_offer;
            if cap >= offer {
                uploads.push(Upload::new(self_id, winner, offer));
                cap -= offer;
                trace!(
                    "agent {}: unchoked {} at {:.2} ({:.2} left)",
                    self_id, winner, offer, cap
                );
            }
            rates.retain(|&(id, _)| id != winner);
        }

        debug!(
            "agent {}: funded {}/{} requesters, {:.2} of {:.2} spent",
            self_id,
            uploads.len(),
            candidates.len(),
            self.up_bw - cap,
            self.up_bw
        );
        uploads
    }

    pub fn reset(&mut self, seed: u64) {
        self.estimates.clear();
        self.refreshed_round = None;
        self.rng = StdRng::seed_from_u64(seed);
    }
}
