//                                     _       _
//   _____      ____ _ _ __ _ __ ___  | | __ _| |__
//  / __\ \ /\ / / _` | '__| '_ ` _ \ | |/ _` | '_ \
//  \__ \\ V  V / (_| | |  | | | | | || | (_| | |_) |
//  |___/ \_/\_/ \__,_|_|  |_| |_| |_||_|\__,_|_.__/

// Companion bench to my queue-management work: the contested resource here is
// upload bandwidth between selfish peers instead of buffer space in a router.
// Same disclaimer as before, I'm sure there is room for improvement.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use swarmlab::agent::BandwidthProfile;
use swarmlab::metrics::analyzer;
use swarmlab::policies::PolicyRegistry;
use swarmlab::simulation::config::SimConfig;
use swarmlab::simulation::Simulation;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{info, Level};

use tracing_subscriber;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(short, long, default_value = "tyrant")]
        policy: String,
        #[arg(short = 'n', long, default_value_t = 16)]
        agents: u32,
        #[arg(long, default_value_t = 1)]
        seeds: u32,
        #[arg(short = 'P', long, default_value_t = 64)]
        pieces: usize,
        #[arg(short, long, default_value_t = 4)]
        blocks: u32,
        #[arg(short, long, default_value_t = 200)]
        rounds: u64,
        #[arg(long, default_value_t = 8)]
        max_requests: usize,
        #[arg(long, default_value = "uniform")]
        bandwidth: String,
        #[arg(long, default_value_t = 32.0)]
        bw: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    Compare {
        #[arg(short, long, default_value = "tyrant,reference,random,even-split")]
        policies: String,
        #[arg(short = 'n', long, default_value_t = 16)]
        agents: u32,
        #[arg(short = 'P', long, default_value_t = 64)]
        pieces: usize,
        #[arg(short, long, default_value_t = 200)]
        rounds: u64,
        #[arg(short = 'R', long, default_value_t = 3)]
        repetitions: u32,
        #[arg(long)]
        latex: bool,
    },

    Analyze {
        #[arg(default_value = "results")]
        path: String,
    },

    List,
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            policy,
            agents,
            seeds,
            pieces,
            blocks,
            rounds,
            max_requests,
            bandwidth,
            bw,
            seed,
        } => {
            run_single_simulation(
                policy,
                agents,
                seeds,
                pieces,
                blocks,
                rounds,
                max_requests,
                bandwidth,
                bw,
                seed,
            )?;
        }

        Commands::Compare {
            policies,
            agents,
            pieces,
            rounds,
            repetitions,
            latex,
        } => {
            compare_policies(policies, agents, pieces, rounds, repetitions, latex, program_start)?;
        }

        Commands::Analyze { path } => {
            analyze_results(&path)?;
        }

        Commands::List => {
            println!("\nAvailable Peer Policies");

            for policy in PolicyRegistry::global().list() {
                println!("  - {}", policy);
            }

            println!("\nUsage: cargo run -- run --policy <name>");
            println!("Example: cargo run -- run --policy tyrant\n");
        }
    }

    let total_time = program_start.elapsed();
    info!("Total runtime: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_single_simulation(
    policy_name: String,
    agents: u32,
    seeds: u32,
    pieces: usize,
    blocks: u32,
    rounds: u64,
    max_requests: usize,
    bandwidth: String,
    bw: f64,
    seed: u64,
) -> Result<()> {
    let profile = parse_bandwidth_profile(&bandwidth, bw)?;

    let config = SimConfig {
        name: format!("{}_{}", policy_name, bandwidth),
        policy_name,
        num_agents: agents,
        num_seeds: seeds,
        num_pieces: pieces,
        blocks_per_piece: blocks,
        max_rounds: rounds,
        max_requests_per_peer: max_requests,
        bandwidth: profile,
        seed,
        ..SimConfig::default()
    };

    info!("SwarmLab: Single Run");

    let mut sim = Simulation::new(config);
    sim.run()?;

    Ok(())
}

fn compare_policies(
    policies_str: String,
    agents: u32,
    pieces: usize,
    rounds: u64,
    repetitions: u32,
    export_latex: bool,
    global_start: Instant,
) -> Result<()> {
    let policy_names: Vec<&str> = policies_str.split(',').map(|s| s.trim()).collect();

    info!("SwarmLab: Comparison");
    info!("");
    info!("Policies: {}", policy_names.join(", "));
    info!("Repetitions: {}", repetitions);
    info!("Rounds per test: {}", rounds);
    info!("");

    let mut all_reports = Vec::new();

    for policy_name in policy_names {
        let elapsed = global_start.elapsed();
        info!("[{}] Testing: {}", format_time(elapsed), policy_name);

        // Repetitions only differ by seed and are fully independent, so
        // they can fan out across worker threads.
        let policy_reports: Result<Vec<_>> = (1..=repetitions)
            .into_par_iter()
            .map(|rep| {
                let config = SimConfig {
                    name: format!("{}_{}", policy_name, rep),
                    policy_name: policy_name.to_string(),
                    num_agents: agents,
                    num_pieces: pieces,
                    max_rounds: rounds,
                    seed: 42 + u64::from(rep),
                    ..SimConfig::default()
                }
                .headless();

                let mut sim = Simulation::new(config);
                sim.run()?;

                let snapshots = sim.metrics.get_snapshots();
                Ok(analyzer::analyze(&snapshots, policy_name))
            })
            .collect();

        let avg_report = average_reports(&policy_reports?);
        all_reports.push(avg_report);
    }

    comparison_table(&all_reports);

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    std::fs::create_dir_all("results")?;
    let comparison_path = format!("results/comparison_{}.json", timestamp);
    std::fs::write(&comparison_path, serde_json::to_string_pretty(&all_reports)?)?;
    info!("Comparison saved to: {}", comparison_path);

    if export_latex {
        let latex_table_path = format!("results/comparison_{}_table.tex", timestamp);
        analyzer::export_latex_table(&all_reports, &latex_table_path)?;
        info!("LaTeX table exported to: {}", latex_table_path);
        info!("Include it with: \\input{{{}}}", latex_table_path);
    }

    Ok(())
}

fn format_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn analyze_results(path: &str) -> Result<()> {
    use std::fs;

    info!("Analyzing results in: {}", path);

    let entries = fs::read_dir(path)?;
    let mut reports = Vec::new();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) == Some("json")
            && path.to_string_lossy().contains("analysis")
        {
            let content = fs::read_to_string(&path)?;
            let report: analyzer::AnalysisReport = serde_json::from_str(&content)?;
            reports.push(report);
        }
    }

    if reports.is_empty() {
        info!("No analysis files found.");
        return Ok(());
    }

    comparison_table(&reports);

    Ok(())
}

fn parse_bandwidth_profile(name: &str, bw: f64) -> Result<BandwidthProfile> {
    match name.to_lowercase().as_str() {
        "uniform" => Ok(BandwidthProfile::Uniform { bw }),
        "two-tier" | "twotier" => Ok(BandwidthProfile::TwoTier {
            low: bw / 2.0,
            high: bw * 2.0,
            high_fraction: 0.25,
        }),
        "exp" | "exponential" => Ok(BandwidthProfile::Exponential { mean: bw }),
        "pareto" => Ok(BandwidthProfile::Pareto {
            scale: bw / 2.0,
            shape: 2.0,
        }),
        _ => anyhow::bail!("Unknown bandwidth profile: {}", name),
    }
}

fn average_reports(reports: &[analyzer::AnalysisReport]) -> analyzer::AnalysisReport {
    let n = reports.len() as f64;

    // Completion only counts when every repetition got there.
    let completion_round = if reports.iter().all(|r| r.completion_round.is_some()) {
        let sum: u64 = reports.iter().filter_map(|r| r.completion_round).sum();
        Some(sum / reports.len() as u64)
    } else {
        None
    };

    analyzer::AnalysisReport {
        policy_name: reports[0].policy_name.clone(),
        rounds: reports.iter().map(|r| r.rounds).max().unwrap_or(0),
        completion_round,
        completed_agents: reports.iter().map(|r| r.completed_agents).min().unwrap_or(0),
        avg_blocks_per_round: reports.iter().map(|r| r.avg_blocks_per_round).sum::<f64>() / n,
        peak_blocks_per_round: reports.iter().map(|r| r.peak_blocks_per_round).max().unwrap_or(0),
        avg_utilization: reports.iter().map(|r| r.avg_utilization).sum::<f64>() / n,
        throughput_stddev: reports.iter().map(|r| r.throughput_stddev).sum::<f64>() / n,
    }
}

// TODO: column widths break on policy names longer than 13 chars
fn comparison_table(reports: &[analyzer::AnalysisReport]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                            POLICY COMPARISON                                  ║");
    println!("╠═══════════════╦═══════════╦═══════════╦════════════╦════════════╦═════════════╣");
    println!("║ Policy        ║ Completed ║ Blocks/rd ║ Peak       ║ Util (%)   ║ Stddev      ║");
    println!("║               ║ (round)   ║           ║ (blocks)   ║            ║ (blocks)    ║");
    println!("╠═══════════════╬═══════════╬═══════════╬════════════╬════════════╬═════════════╣");

    for report in reports {
        let completion = report
            .completion_round
            .map(|r| r.to_string())
            .unwrap_or_else(|| "--".to_string());
        println!(
            "║ {:<13} ║ {:>9} ║ {:>9.1} ║ {:>10} ║ {:>10.1} ║ {:>11.2} ║",
            report.policy_name,
            completion,
            report.avg_blocks_per_round,
            report.peak_blocks_per_round,
            report.avg_utilization * 100.0,
            report.throughput_stddev,
        );
    }

    println!("╚═══════════════╩═══════════╩═══════════╩════════════╩════════════╩═════════════╝\n");

    if let Some(fastest) = reports
        .iter()
        .filter(|r| r.completion_round.is_some())
        .min_by_key(|r| r.completion_round)
    {
        println!(
            "Fastest completion: {} (round {})",
            fastest.policy_name,
            fastest.completion_round.unwrap_or(0)
        );
    }

    if let Some(best_throughput) = reports.iter().max_by(|a, b| {
        a.avg_blocks_per_round
            .partial_cmp(&b.avg_blocks_per_round)
            .unwrap()
    }) {
        println!(
            "Top throughput: {} ({:.1} blocks/round)",
            best_throughput.policy_name, best_throughput.avg_blocks_per_round
        );
    }

    println!();
}
