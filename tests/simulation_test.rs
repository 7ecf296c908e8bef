use swarmlab::agent::BandwidthProfile;
use swarmlab::simulation::{SimConfig, Simulation};

fn small_config(policy: &str, seed: u64) -> SimConfig {
    SimConfig {
        name: format!("test_{}", policy),
        policy_name: policy.to_string(),
        num_agents: 5,
        num_seeds: 1,
        num_pieces: 8,
        blocks_per_piece: 2,
        max_rounds: 300,
        max_requests_per_peer: 8,
        initial_piece_fraction: 0.0,
        bandwidth: BandwidthProfile::Uniform { bw: 8.0 },
        seed,
        ..SimConfig::default()
    }
    .headless()
}

#[test]
fn test_even_split_swarm_completes() {
    let mut sim = Simulation::new(small_config("even-split", 1));
    sim.run().unwrap();

    let snapshots = sim.metrics.get_snapshots();
    let last = snapshots.last().unwrap();

    assert_eq!(last.completed_agents, 5);
    assert!(last.avg_completion >= 1.0 - 1e-9);
    // Early stop kicked in well before the round cap.
    assert!(snapshots.len() < 300);
}

#[test]
fn test_reference_swarm_completes() {
    let mut sim = Simulation::new(small_config("reference", 2));
    sim.run().unwrap();

    let last = sim.metrics.get_snapshots().last().cloned().unwrap();
    assert_eq!(last.completed_agents, 5);
}

#[test]
fn test_tyrant_swarm_makes_progress() {
    let mut config = small_config("tyrant", 3);
    config.max_rounds = 100;
    let mut sim = Simulation::new(config);
    sim.run().unwrap();

    let snapshots = sim.metrics.get_snapshots();
    let first = snapshots.first().unwrap();
    let last = snapshots.last().unwrap();

    assert!(last.total_blocks > 0);
    assert!(last.avg_completion > first.avg_completion || last.avg_completion >= 1.0 - 1e-9);
}

#[test]
fn test_history_grows_one_entry_per_round() {
    let mut config = small_config("even-split", 4);
    config.max_rounds = 10;
    let mut sim = Simulation::new(config);
    sim.run().unwrap();

    let rounds_recorded = sim.history.current_round();
    let snapshots = sim.metrics.get_snapshots();
    assert_eq!(rounds_recorded as usize, snapshots.len());
}

#[test]
fn test_same_seed_replays_identically() {
    let run = |seed: u64| {
        let mut sim = Simulation::new(small_config("tyrant", seed));
        sim.run().unwrap();
        sim.metrics
            .get_snapshots()
            .iter()
            .map(|s| s.blocks_moved)
            .collect::<Vec<_>>()
    };

    assert_eq!(run(7), run(7));
    // A different seed should shake something loose eventually; this is a
    // smoke check, not a statistical claim.
    assert!(!run(7).is_empty());
}

#[test]
fn test_unknown_policy_is_an_error() {
    let config = small_config("no-such-policy", 1);
    let mut sim = Simulation::new(config);
    assert!(sim.run().is_err());
}
