use super::MetricsSnapshot;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub policy_name: String,
    pub rounds: u64,
    /// Round at which every agent held every piece, if the run got there.
    pub completion_round: Option<u64>,
    pub completed_agents: u32,
    pub avg_blocks_per_round: f64,
    pub peak_blocks_per_round: u64,
    pub avg_utilization: f64,
    /// Stddev of per-round throughput, a rough churn indicator.
    pub throughput_stddev: f64,
}

pub fn analyze(snapshots: &[MetricsSnapshot], policy_name: &str) -> AnalysisReport {
    let rounds = snapshots.len() as u64;
    let n = snapshots.len().max(1) as f64;

    let avg_blocks = snapshots.iter().map(|s| s.blocks_moved as f64).sum::<f64>() / n;
    let peak_blocks = snapshots.iter().map(|s| s.blocks_moved).max().unwrap_or(0);
    let avg_utilization = snapshots.iter().map(|s| s.utilization).sum::<f64>() / n;

    let variance = snapshots
        .iter()
        .map(|s| {
            let d = s.blocks_moved as f64 - avg_blocks;
            d * d
        })
        .sum::<f64>()
        / n;

    let last = snapshots.last();
    let completed_agents = last.map(|s| s.completed_agents).unwrap_or(0);
    let completion_round = snapshots
        .iter()
        .find(|s| s.avg_completion >= 1.0 - 1e-9)
        .map(|s| s.round);

    AnalysisReport {
        policy_name: policy_name.to_string(),
        rounds,
        completion_round,
        completed_agents,
        avg_blocks_per_round: avg_blocks,
        peak_blocks_per_round: peak_blocks,
        avg_utilization,
        throughput_stddev: variance.sqrt(),
    }
}

pub fn export_latex_table(reports: &[AnalysisReport], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::new();
    writeln!(out, "\\begin{{table}}[h]")?;
    writeln!(out, "\\centering")?;
    writeln!(out, "\\begin{{tabular}}{{lrrrr}}")?;
    writeln!(out, "\\hline")?;
    writeln!(
        out,
        "Policy & Completion round & Avg blocks/round & Peak & Utilization \\\\"
    )?;
    writeln!(out, "\\hline")?;
    for report in reports {
        let completion = report
            .completion_round
            .map(|r| r.to_string())
            .unwrap_or_else(|| "--".to_string());
        writeln!(
            out,
            "{} & {} & {:.1} & {} & {:.1}\\% \\\\",
            report.policy_name.replace('_', "\\_"),
            completion,
            report.avg_blocks_per_round,
            report.peak_blocks_per_round,
            report.avg_utilization * 100.0,
        )?;
    }
    writeln!(out, "\\hline")?;
    writeln!(out, "\\end{{tabular}}")?;
    writeln!(out, "\\caption{{Policy comparison}}")?;
    writeln!(out, "\\label{{tab:policy_comparison}}")?;
    writeln!(out, "\\end{{table}}")?;

    std::fs::write(path, out)?;
    Ok(())
}

/// Round-indexed throughput pairs, pgfplots-friendly.
pub fn export_latex_plot_data(snapshots: &[MetricsSnapshot], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::from("# round blocks_moved avg_completion\n");
    for s in snapshots {
        writeln!(out, "{} {} {:.4}", s.round, s.blocks_moved, s.avg_completion)?;
    }
    std::fs::write(path, out)?;
    Ok(())
}
