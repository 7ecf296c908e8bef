use crate::swarm::{AgentId, PeerView, PieceIndex, PossessionVector, Request};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::debug;

/// Rarest-first request planning.
///
/// Pieces are ranked by how many peers advertise them (fewest holders
/// first, ties on piece index so the order is stable), then requests are
/// emitted rare-to-common from every holder that still has request budget
/// left. Asking several peers for the same piece is deliberate redundancy;
/// asking the same peer twice for one piece is not, and can't happen here
/// because a holder appears once per piece.
#[derive(Debug, Clone)]
pub struct RequestPlanner {
    max_requests_per_peer: usize,
    rng: StdRng,
}

impl RequestPlanner {
    pub fn new(max_requests_per_peer: usize, seed: u64) -> Self {
        Self {
            max_requests_per_peer,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pure round computation: never blocks, never fails, returns an empty
    /// list when there's nothing worth asking for.
    pub fn plan(
        &mut self,
        agent_id: AgentId,
        possession: &PossessionVector,
        peers: &[PeerView],
    ) -> Vec<Request> {
        if self.max_requests_per_peer == 0 {
            return Vec::new();
        }

        let needed = possession.needed_pieces();
        if needed.is_empty() {
            debug!("agent {} has every piece, nothing to request", agent_id);
            return Vec::new();
        }

        // piece -> peers advertising it complete
        let mut holders: HashMap<PieceIndex, Vec<AgentId>> = HashMap::new();
        for peer in peers {
            for &piece in &peer.available_pieces {
                holders.entry(piece).or_default().push(peer.peer_id);
            }
        }

        // Fewest holders first; equal rarity keeps piece-index order.
        let mut rarity_order: Vec<(PieceIndex, Vec<AgentId>)> = holders.into_iter().collect();
        rarity_order.sort_by_key(|(piece, held_by)| (held_by.len(), *piece));

        let mut requests = Vec::new();
        let mut issued: HashMap<AgentId, usize> = HashMap::new();

        for (piece, mut held_by) in rarity_order {
            if !needed.contains(&piece) {
                continue;
            }
            let start_block = possession.blocks_held(piece);

            // Equally useful holders are drawn in random order so no peer
            // soaks up everyone's request budget just by sorting first.
            held_by.shuffle(&mut self.rng);

            for peer_id in held_by {
                let count = issued.entry(peer_id).or_insert(0);
                if *count >= self.max_requests_per_peer {
                    continue;
                }
                *count += 1;
                requests.push(Request::new(agent_id, peer_id, piece, start_block));
            }
        }

        debug!(
            "agent {} planned {} requests over {} needed pieces",
            agent_id,
            requests.len(),
            needed.len()
        );
        requests
    }

    pub fn reset(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}
