use swarmlab::metrics::{analyzer, logger, MetricsCollector, MetricsSnapshot};

fn snapshot(round: u64, blocks: u64, completion: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        round,
        blocks_moved: blocks,
        total_blocks: 0,
        bandwidth_offered: blocks as f64,
        utilization: 0.5,
        completed_agents: 0,
        avg_completion: completion,
    }
}

#[test]
fn test_collector_round_lifecycle() {
    let metrics = MetricsCollector::new();
    metrics.set_population(4, 40.0);

    metrics.blocks_moved(10);
    metrics.bandwidth_offered(20.0);
    metrics.set_completion(1, 0.25);
    metrics.save_snapshot(0);

    metrics.blocks_moved(6);
    metrics.bandwidth_offered(10.0);
    metrics.set_completion(2, 0.5);
    metrics.save_snapshot(1);

    let snapshots = metrics.get_snapshots();
    assert_eq!(snapshots.len(), 2);

    assert_eq!(snapshots[0].blocks_moved, 10);
    assert_eq!(snapshots[0].total_blocks, 10);
    assert_eq!(snapshots[0].utilization, 0.5);

    // Round counters reset between snapshots, totals accumulate.
    assert_eq!(snapshots[1].blocks_moved, 6);
    assert_eq!(snapshots[1].total_blocks, 16);
    assert_eq!(snapshots[1].utilization, 0.25);
    assert_eq!(snapshots[1].completed_agents, 2);
}

#[test]
fn test_snapshot_csv_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshots.csv");

    let original = vec![snapshot(0, 12, 0.3), snapshot(1, 8, 0.6), snapshot(2, 4, 1.0)];
    logger::write_snapshots(&path, &original).unwrap();

    let restored = logger::read_snapshots(&path).unwrap();
    assert_eq!(restored.len(), 3);
    assert_eq!(restored[1].round, 1);
    assert_eq!(restored[1].blocks_moved, 8);
    assert_eq!(restored[2].avg_completion, 1.0);
}

#[test]
fn test_analyze_report_basics() {
    let snapshots = vec![snapshot(0, 10, 0.4), snapshot(1, 20, 0.8), snapshot(2, 6, 1.0)];

    let report = analyzer::analyze(&snapshots, "tyrant");

    assert_eq!(report.policy_name, "tyrant");
    assert_eq!(report.rounds, 3);
    assert_eq!(report.peak_blocks_per_round, 20);
    assert_eq!(report.avg_blocks_per_round, 12.0);
    assert_eq!(report.completion_round, Some(2));
}

#[test]
fn test_analyze_incomplete_run_has_no_completion_round() {
    let snapshots = vec![snapshot(0, 10, 0.4), snapshot(1, 20, 0.8)];
    let report = analyzer::analyze(&snapshots, "random");
    assert_eq!(report.completion_round, None);
}
