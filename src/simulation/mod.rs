pub mod config;
pub use config::SimConfig;

use crate::agent::Agent;
use crate::metrics::{analyzer, logger, MetricsCollector};
use crate::policies::{PolicyConfig, PolicyRegistry};
use crate::swarm::{AgentId, Download, PeerView, Request, RoundHistory, Upload};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info};

/// Tolerance when checking a policy's issued bandwidth against its budget.
const BUDGET_EPS: f64 = 1e-6;

/// Round-lockstep driver. Each round every agent plans its requests
/// against the same availability snapshot, then (with all requests on the
/// table) every agent allocates its uploads, then blocks are delivered and
/// the round is appended to history. Strictly single-threaded; the only
/// state that survives a round is possession, history, and whatever the
/// policies keep for themselves.
pub struct Simulation {
    config: SimConfig,
    pub metrics: MetricsCollector,
    pub history: RoundHistory,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            metrics: MetricsCollector::new(),
            history: RoundHistory::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        info!("Starting simulation: {}", self.config.name);
        info!("Policy: {}", self.config.policy_name);
        info!(
            "Agents: {} ({} seeds), pieces: {} x {} blocks",
            self.config.num_agents,
            self.config.num_seeds,
            self.config.num_pieces,
            self.config.blocks_per_piece
        );

        anyhow::ensure!(self.config.num_agents > 0, "swarm needs at least one agent");
        anyhow::ensure!(self.config.num_pieces > 0, "swarm needs at least one piece");

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut agents = self.build_agents(&mut rng)?;

        let total_capacity: f64 = agents.iter().map(Agent::up_bw).sum();
        self.metrics
            .set_population(self.config.num_agents, total_capacity);

        let pb = if self.config.progress {
            let pb = ProgressBar::new(self.config.max_rounds);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len} rounds {msg}")?
                    .progress_chars("█▓░"),
            );
            Some(pb)
        } else {
            None
        };

        for round in 0..self.config.max_rounds {
            self.play_round(&mut agents)?;

            let completed = agents.iter().filter(|a| a.is_complete()).count() as u32;
            let avg_completion =
                agents.iter().map(Agent::completion).sum::<f64>() / agents.len() as f64;
            self.metrics.set_completion(completed, avg_completion);
            self.metrics.save_snapshot(round);

            if let Some(pb) = &pb {
                pb.inc(1);
                pb.set_message(format!(
                    "done: {}/{} | avg: {:.1}%",
                    completed,
                    agents.len(),
                    avg_completion * 100.0
                ));
            }

            if completed as usize == agents.len() {
                info!("All agents complete after round {}", round);
                break;
            }
        }

        if let Some(pb) = &pb {
            pb.finish_with_message("Simulation complete");
        }

        if self.config.write_results {
            self.save_results()?;
        }
        Ok(())
    }

    fn build_agents(&self, rng: &mut StdRng) -> Result<Vec<Agent>> {
        let mut agents = Vec::with_capacity(self.config.num_agents as usize);

        for i in 0..self.config.num_agents {
            let up_bw = self.config.bandwidth.sample(rng);
            let policy_config = PolicyConfig {
                up_bw,
                max_requests_per_peer: self.config.max_requests_per_peer,
                seed: self.config.seed.wrapping_add(u64::from(i) << 8),
            };
            let policy = PolicyRegistry::global()
                .create(&self.config.policy_name, &policy_config)
                .ok_or_else(|| {
                    anyhow::anyhow!("Unknown policy: {}", self.config.policy_name)
                })?;

            let mut agent = Agent::new(
                AgentId::new(i),
                self.config.num_pieces,
                self.config.blocks_per_piece,
                up_bw,
                policy,
            );

            if i < self.config.num_seeds {
                for piece in 0..self.config.num_pieces {
                    agent.grant_piece(piece);
                }
            } else {
                for piece in 0..self.config.num_pieces {
                    if rng.gen_bool(self.config.initial_piece_fraction.clamp(0.0, 1.0)) {
                        agent.grant_piece(piece);
                    }
                }
            }

            agents.push(agent);
        }

        Ok(agents)
    }

    fn play_round(&mut self, agents: &mut [Agent]) -> Result<()> {
        // One consistent snapshot for everyone this round.
        let views: Vec<PeerView> = agents.iter().map(Agent::peer_view).collect();

        // Plan phase.
        let mut all_requests: Vec<Request> = Vec::new();
        for agent in agents.iter_mut() {
            let peers: Vec<PeerView> = views
                .iter()
                .filter(|v| v.peer_id != agent.id())
                .cloned()
                .collect();
            all_requests.extend(agent.plan_requests(&peers, &self.history));
        }

        // Allocate phase, now that every agent's requests are known.
        let mut by_target: HashMap<AgentId, Vec<Request>> = HashMap::new();
        for req in &all_requests {
            by_target.entry(req.peer_id).or_default().push(*req);
        }

        let mut all_uploads: Vec<Upload> = Vec::new();
        for agent in agents.iter_mut() {
            let incoming = by_target.remove(&agent.id()).unwrap_or_default();
            let peers: Vec<PeerView> = views
                .iter()
                .filter(|v| v.peer_id != agent.id())
                .cloned()
                .collect();
            let uploads = agent.allocate_uploads(&incoming, &peers, &self.history);

            let issued: f64 = uploads.iter().map(|u| u.bandwidth).sum();
            if issued > agent.up_bw() + BUDGET_EPS {
                anyhow::bail!(
                    "policy {} over-allocated agent {}: {:.3} issued, {:.3} available",
                    agent.policy_name(),
                    agent.id(),
                    issued,
                    agent.up_bw()
                );
            }

            self.metrics.bandwidth_offered(issued);
            all_uploads.extend(uploads);
        }

        // Delivery: each upload moves whole blocks along the receiver's
        // requests to that sender, in the order they were asked for.
        let mut downloads: Vec<Download> = Vec::new();
        for upload in &all_uploads {
            let mut budget = upload.bandwidth.floor() as u32;
            if budget == 0 {
                continue;
            }
            let receiver_idx = upload.to_id.value() as usize;

            for req in all_requests
                .iter()
                .filter(|r| r.requester_id == upload.to_id && r.peer_id == upload.from_id)
            {
                if budget == 0 {
                    break;
                }
                let applied = agents[receiver_idx].receive_blocks(req.piece, budget);
                if applied > 0 {
                    downloads.push(Download {
                        from_id: upload.from_id,
                        to_id: upload.to_id,
                        piece: req.piece,
                        blocks: applied,
                    });
                    budget -= applied;
                }
            }
        }

        let moved: u64 = downloads.iter().map(|d| u64::from(d.blocks)).sum();
        self.metrics.blocks_moved(moved);
        debug!(
            "round {}: {} requests, {} uploads, {} blocks moved",
            self.history.current_round(),
            all_requests.len(),
            all_uploads.len(),
            moved
        );

        self.history.push_round(downloads, all_uploads);
        Ok(())
    }

    fn save_results(&self) -> Result<()> {
        let snapshots = self.metrics.get_snapshots();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

        std::fs::create_dir_all("results")?;

        let csv_path = format!("results/{}_{}.csv", self.config.name, timestamp);
        logger::write_snapshots(&csv_path, &snapshots)?;
        info!("Results saved to: {}", csv_path);

        let report = analyzer::analyze(&snapshots, &self.config.policy_name);

        let json_path = format!("results/{}_{}_analysis.json", self.config.name, timestamp);
        std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)?;
        info!("Analysis saved to: {}", json_path);

        let plot_data_path = format!("results/{}_{}_plot.dat", self.config.name, timestamp);
        analyzer::export_latex_plot_data(&snapshots, &plot_data_path)?;
        info!("Plot data saved to: {}", plot_data_path);

        info!("Avg blocks/round: {:.2}", report.avg_blocks_per_round);
        info!("Avg utilization: {:.1}%", report.avg_utilization * 100.0);
        match report.completion_round {
            Some(r) => info!("Swarm completed at round {}", r),
            None => info!("Swarm did not complete within {} rounds", report.rounds),
        }

        Ok(())
    }
}
