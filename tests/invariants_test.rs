use proptest::collection::vec;
use proptest::prelude::*;
use swarmlab::policies::auction::{AllocationEngine, PeerEstimate};
use swarmlab::policies::planner::RequestPlanner;
use swarmlab::policies::even_split;
use swarmlab::swarm::{AgentId, PeerView, PossessionVector, Request, RoundHistory};

proptest! {
    // The budget invariant has to hold for any mix of estimates, not just
    // the friendly ones from the unit tests.
    #[test]
    fn prop_allocation_never_exceeds_budget(
        up_bw in 1.0f64..100.0,
        estimates in vec((0.1f64..50.0, 0.0f64..100.0), 1..20),
        seed in any::<u64>(),
    ) {
        let mut engine = AllocationEngine::new(up_bw, seed);
        let mut requests = Vec::new();
        for (i, &(offer, rate)) in estimates.iter().enumerate() {
            let peer = AgentId::new(i as u32 + 1);
            engine.seed_estimate(peer, PeerEstimate {
                upload_offer: offer,
                download_rate: rate,
                reciprocal_rounds: 0,
            });
            requests.push(Request::new(peer, AgentId::new(0), 0, 0));
        }

        let uploads = engine.allocate(AgentId::new(0), &requests, &[], &RoundHistory::new(), 0);

        let total: f64 = uploads.iter().map(|u| u.bandwidth).sum();
        prop_assert!(total <= up_bw + 1e-6);
        for upload in &uploads {
            prop_assert!(upload.bandwidth > 0.0);
        }
    }

    // Whatever the availability looks like, the planner only ever asks for
    // needed pieces, resumes at the held prefix, respects the per-peer
    // cap, and emits in non-decreasing rarity order.
    #[test]
    fn prop_planner_requests_are_well_formed(
        (num_pieces, blocks_per_piece, held, availability, max_requests, seed) in
            (1usize..24, 1u32..6).prop_flat_map(|(n, bpp)| (
                Just(n),
                Just(bpp),
                vec(0u32..=bpp, n),
                vec(vec(any::<bool>(), n), 0..6),
                0usize..5,
                any::<u64>(),
            )),
    ) {
        let mut possession = PossessionVector::new(num_pieces, blocks_per_piece);
        for (piece, &blocks) in held.iter().enumerate() {
            possession.add_blocks(piece, blocks);
        }

        let peers: Vec<PeerView> = availability
            .iter()
            .enumerate()
            .map(|(i, has)| {
                let set = has
                    .iter()
                    .enumerate()
                    .filter_map(|(piece, &h)| h.then_some(piece))
                    .collect();
                PeerView::new(AgentId::new(i as u32 + 1), set)
            })
            .collect();

        let mut planner = RequestPlanner::new(max_requests, seed);
        let requests = planner.plan(AgentId::new(0), &possession, &peers);

        let mut per_peer = std::collections::HashMap::new();
        let mut pairs = std::collections::HashSet::new();
        for req in &requests {
            prop_assert!(possession.is_needed(req.piece));
            prop_assert_eq!(req.start_block, possession.blocks_held(req.piece));

            let peer = peers.iter().find(|p| p.peer_id == req.peer_id).unwrap();
            prop_assert!(peer.available_pieces.contains(&req.piece));

            let count = per_peer.entry(req.peer_id).or_insert(0usize);
            *count += 1;
            prop_assert!(*count <= max_requests);

            prop_assert!(pairs.insert((req.piece, req.peer_id)));
        }

        // First occurrence of each piece must march from rare to common.
        let holder_count = |piece: usize| {
            peers.iter().filter(|p| p.available_pieces.contains(&piece)).count()
        };
        let mut seen_pieces = Vec::new();
        for req in &requests {
            if !seen_pieces.contains(&req.piece) {
                seen_pieces.push(req.piece);
            }
        }
        for pair in seen_pieces.windows(2) {
            let a = (holder_count(pair[0]), pair[0]);
            let b = (holder_count(pair[1]), pair[1]);
            prop_assert!(a < b);
        }
    }

    #[test]
    fn prop_even_split_sums_to_budget(bw in 0.0f64..1000.0, n in 1usize..50) {
        let shares = even_split(bw, n);
        prop_assert_eq!(shares.len(), n);
        let total: f64 = shares.iter().sum();
        prop_assert!((total - bw).abs() < 1e-6);
    }
}
